// Drives units, sources and sinks tick by tick until every sink has
// collected what the test suite expects, or the tick budget runs out.

use crate::boundary::{Sink, Source};
use crate::channel::ChannelRef;
use crate::scheduler::{Discipline, Participants, Scheduler, Step, TaskId};
use crate::unit::ComputingUnit;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const DEFAULT_MAX_TICKS: usize = 1000;

/// Values fed into input ports and values expected on output ports, both
/// keyed by port index. Only the number of expected values matters to the
/// harness; comparing them is left to the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestSuite {
    pub inputs: BTreeMap<usize, Vec<i64>>,
    pub outputs: BTreeMap<usize, Vec<i64>>,
}

impl TestSuite {
    pub fn new() -> Self {
        TestSuite::default()
    }

    pub fn input(mut self, port: usize, values: Vec<i64>) -> Self {
        self.inputs.insert(port, values);
        self
    }

    pub fn output(mut self, port: usize, values: Vec<i64>) -> Self {
        self.outputs.insert(port, values);
        self
    }

    fn expected(&self, port: usize) -> usize {
        self.outputs.get(&port).map_or(0, Vec::len)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Statistics {
    pub ticks: usize,
    /// Per input port, the values that never made it into the grid.
    pub input_backlog: BTreeMap<usize, usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Evaluation {
    pub outputs: BTreeMap<usize, Vec<i64>>,
    pub statistics: Statistics,
}

/// Participants in stepping order: units, then sources, then sinks.
struct Roster {
    units: Vec<ComputingUnit>,
    sources: Vec<(usize, Source)>,
    sinks: Vec<(usize, Sink, usize)>,
}

impl Participants for Roster {
    fn count(&self) -> usize {
        self.units.len() + self.sources.len() + self.sinks.len()
    }

    fn participant(&mut self, task: TaskId) -> &mut dyn Step {
        let units = self.units.len();
        let sources = self.sources.len();
        if task < units {
            return &mut self.units[task];
        }
        if task < units + sources {
            return &mut self.sources[task - units].1;
        }
        &mut self.sinks[task - units - sources].1
    }
}

pub struct Harness {
    roster: Roster,
    scheduler: Scheduler,
    ticks: usize,
}

impl Harness {
    /// Wires one `Source` to each of `inputs` and one `Sink` to each of
    /// `outputs`. Port `k` of the suite is the `k`-th channel.
    pub fn new(
        suite: &TestSuite,
        units: Vec<ComputingUnit>,
        inputs: &[ChannelRef],
        outputs: &[ChannelRef],
    ) -> Self {
        let sources: Vec<(usize, Source)> = inputs
            .iter()
            .enumerate()
            .map(|(port, channel)| {
                let values = suite.inputs.get(&port).cloned().unwrap_or_default();
                (port, Source::new(values, channel))
            })
            .collect();
        let sinks: Vec<(usize, Sink, usize)> = outputs
            .iter()
            .enumerate()
            .map(|(port, channel)| (port, Sink::new(channel), suite.expected(port)))
            .collect();
        let roster = Roster {
            units,
            sources,
            sinks,
        };
        let scheduler = Scheduler::new(roster.count(), Discipline::default());
        Harness {
            roster,
            scheduler,
            ticks: 0,
        }
    }

    /// Only meaningful before the first tick.
    pub fn with_discipline(mut self, discipline: Discipline) -> Self {
        self.scheduler = Scheduler::new(self.roster.count(), discipline);
        self
    }

    pub fn discipline(&self) -> Discipline {
        self.scheduler.discipline()
    }

    pub fn tick(&mut self) {
        self.scheduler.tick(&mut self.roster);
        self.ticks += 1;
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn units(&self) -> &[ComputingUnit] {
        &self.roster.units
    }

    /// Units may be recompiled between ticks. A unit blocked on a port gives
    /// up that operation and starts the new program on the next tick.
    pub fn units_mut(&mut self) -> &mut [ComputingUnit] {
        &mut self.roster.units
    }

    /// Whether every sink holds at least as many values as expected.
    pub fn is_complete(&self) -> bool {
        self.roster
            .sinks
            .iter()
            .all(|(_, sink, expected)| sink.results().len() >= *expected)
    }

    /// Ticks until complete or until `max_ticks` more ticks have run, then
    /// settles. Returns the number of ticks run by this call.
    pub fn run(&mut self, max_ticks: usize) -> usize {
        let mut ran = 0;
        while ran < max_ticks && !self.is_complete() {
            self.tick();
            ran += 1;
        }
        self.settle();
        ran
    }

    /// Lets continuations that were already woken land. Starts no new step.
    pub fn settle(&mut self) {
        let landed = self.scheduler.settle(&mut self.roster);
        if landed > 0 {
            debug!(landed, "settled woken continuations");
        }
    }

    pub fn evaluation(&self) -> Evaluation {
        Evaluation {
            outputs: self
                .roster
                .sinks
                .iter()
                .map(|(port, sink, _)| (*port, sink.results().to_vec()))
                .collect(),
            statistics: Statistics {
                ticks: self.ticks,
                input_backlog: self
                    .roster
                    .sources
                    .iter()
                    .map(|(port, source)| (*port, source.backlog()))
                    .collect(),
            },
        }
    }
}

/// Runs `units` against `suite` with the default discipline.
pub fn evaluate(
    suite: &TestSuite,
    units: Vec<ComputingUnit>,
    inputs: &[ChannelRef],
    outputs: &[ChannelRef],
    max_ticks: usize,
) -> Evaluation {
    let mut harness = Harness::new(suite, units, inputs, outputs);
    harness.run(max_ticks);
    let evaluation = harness.evaluation();
    info!(
        ticks = evaluation.statistics.ticks,
        complete = harness.is_complete(),
        "evaluation finished"
    );
    evaluation
}
