// Rectangular layout of units.
//
// Neighbours share one channel per edge: a unit's RIGHT is the LEFT of the
// unit next to it, its DOWN is the UP of the unit below. Column `k` has an
// input channel into the UP of its top unit and an output channel out of
// the DOWN of its bottom unit. Every channel has the same capacity.

use crate::channel::{Channel, ChannelRef};
use crate::error::GridError;
use crate::harness::{Harness, TestSuite};
use crate::language::Port;
use crate::unit::{ComputingUnit, Ports};
use std::collections::HashMap;
use tracing::debug;

pub const DEFAULT_CAPACITY: usize = 1;

pub struct GridBuilder {
    rows: usize,
    cols: usize,
    capacity: usize,
    nodes: Vec<(usize, usize, String)>,
}

impl GridBuilder {
    pub fn new(rows: usize, cols: usize) -> Self {
        GridBuilder {
            rows,
            cols,
            capacity: DEFAULT_CAPACITY,
            nodes: Vec::new(),
        }
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Assigns a program to the unit at `(row, col)`. Positions without a
    /// program hold an inert unit.
    pub fn node<S: Into<String>>(mut self, row: usize, col: usize, source: S) -> Self {
        self.nodes.push((row, col, source.into()));
        self
    }

    pub fn build(self) -> Result<Grid, GridError> {
        let (rows, cols) = (self.rows, self.cols);
        let mut sources = HashMap::new();
        for (row, col, source) in self.nodes.into_iter() {
            if row >= rows || col >= cols {
                return Err(GridError::OutOfBounds {
                    row,
                    col,
                    rows,
                    cols,
                });
            }
            if sources.insert((row, col), source).is_some() {
                return Err(GridError::Occupied { row, col });
            }
        }

        let capacity = self.capacity;
        let mut ports = vec![Ports::new(); rows * cols];
        let idx = |row: usize, col: usize| row * cols + col;

        for row in 0..rows {
            for col in 1..cols {
                let channel = Channel::shared(capacity);
                ports[idx(row, col - 1)].set(Port::Right, channel.clone());
                ports[idx(row, col)].set(Port::Left, channel);
            }
        }
        for row in 1..rows {
            for col in 0..cols {
                let channel = Channel::shared(capacity);
                ports[idx(row - 1, col)].set(Port::Down, channel.clone());
                ports[idx(row, col)].set(Port::Up, channel);
            }
        }

        let mut inputs = Vec::with_capacity(cols);
        let mut outputs = Vec::with_capacity(cols);
        if rows > 0 {
            for col in 0..cols {
                let input = Channel::shared(capacity);
                ports[idx(0, col)].set(Port::Up, input.clone());
                inputs.push(input);
                let output = Channel::shared(capacity);
                ports[idx(rows - 1, col)].set(Port::Down, output.clone());
                outputs.push(output);
            }
        }

        let mut units = Vec::with_capacity(rows * cols);
        for (i, unit_ports) in ports.into_iter().enumerate() {
            let (row, col) = (i / cols, i % cols);
            let unit = match sources.remove(&(row, col)) {
                Some(source) => {
                    ComputingUnit::with_source(unit_ports, &source).map_err(|source| {
                        debug!(row, col, line = source.line(), "node does not compile");
                        GridError::Compile { row, col, source }
                    })?
                }
                None => ComputingUnit::new(unit_ports),
            };
            units.push(unit.with_id(format!("{}:{}", row, col)));
        }

        debug!(rows, cols, capacity, "built grid");
        Ok(Grid {
            rows,
            cols,
            units,
            inputs,
            outputs,
        })
    }
}

pub struct Grid {
    rows: usize,
    cols: usize,
    units: Vec<ComputingUnit>,
    inputs: Vec<ChannelRef>,
    outputs: Vec<ChannelRef>,
}

impl Grid {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn unit(&self, row: usize, col: usize) -> Option<&ComputingUnit> {
        if row < self.rows && col < self.cols {
            self.units.get(row * self.cols + col)
        } else {
            None
        }
    }

    /// Units in row-major order.
    pub fn units(&self) -> &[ComputingUnit] {
        &self.units
    }

    pub fn inputs(&self) -> &[ChannelRef] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[ChannelRef] {
        &self.outputs
    }

    pub fn into_parts(self) -> (Vec<ComputingUnit>, Vec<ChannelRef>, Vec<ChannelRef>) {
        (self.units, self.inputs, self.outputs)
    }

    pub fn into_harness(self, suite: &TestSuite) -> Harness {
        let (units, inputs, outputs) = self.into_parts();
        Harness::new(suite, units, &inputs, &outputs)
    }
}
