//! Dense affinity matrix and the per-call index that addresses it.

use std::collections::HashMap;
use std::hash::Hash;

use crate::domain::interaction::{InteractionEvent, InteractionKind};
use crate::domain::item::ItemId;
use crate::domain::requester::RequesterId;

/// Row-major dense matrix of `f64`.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self { rows, cols, data: vec![0.0; rows * cols] }
    }

    #[cfg(test)]
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        let row_count = rows.len();
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(row_count * cols);
        for row in rows {
            assert_eq!(row.len(), cols, "all rows must have the same length");
            data.extend(row);
        }
        Self { rows: row_count, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] += value;
    }

    pub fn row(&self, row: usize) -> &[f64] {
        let start = row * self.cols;
        &self.data[start..start + self.cols]
    }

    pub fn transpose(&self) -> Matrix {
        let mut transposed = Matrix::zeros(self.cols, self.rows);
        for row in 0..self.rows {
            for col in 0..self.cols {
                transposed.set(col, row, self.get(row, col));
            }
        }
        transposed
    }

    /// Row vector times matrix: `vector · self`.
    pub fn left_multiply(&self, vector: &[f64]) -> Vec<f64> {
        assert_eq!(vector.len(), self.rows, "vector length must match row count");
        let mut out = vec![0.0; self.cols];
        for (row, weight) in vector.iter().enumerate() {
            if *weight == 0.0 {
                continue;
            }
            for (slot, value) in out.iter_mut().zip(self.row(row)) {
                *slot += weight * value;
            }
        }
        out
    }
}

/// Bijective id → dense position map, valid for a single build.
#[derive(Clone, Debug)]
pub struct DenseIndex<K> {
    ids: Vec<K>,
    positions: HashMap<K, usize>,
}

impl<K: Copy + Eq + Hash> DenseIndex<K> {
    /// Positions follow enumeration order; repeated ids keep their first slot.
    pub fn from_ids(ids: impl IntoIterator<Item = K>) -> Self {
        let mut index = Self { ids: Vec::new(), positions: HashMap::new() };
        for id in ids {
            if !index.positions.contains_key(&id) {
                index.positions.insert(id, index.ids.len());
                index.ids.push(id);
            }
        }
        index
    }

    pub fn position(&self, id: &K) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn id_at(&self, position: usize) -> Option<K> {
        self.ids.get(position).copied()
    }

    pub fn ids(&self) -> &[K] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Weight each interaction kind contributes to an affinity cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventWeights {
    pub observe: f64,
    pub stage: f64,
    pub acquire: f64,
}

impl EventWeights {
    pub fn weight(&self, kind: InteractionKind) -> f64 {
        match kind {
            InteractionKind::Observe => self.observe,
            InteractionKind::Stage => self.stage,
            InteractionKind::Acquire => self.acquire,
        }
    }
}

impl Default for EventWeights {
    fn default() -> Self {
        super::DEFAULT_EVENT_WEIGHTS
    }
}

/// Output of a successful build: the matrix plus the indexes addressing it.
#[derive(Clone, Debug)]
pub struct AffinityModel {
    pub matrix: Matrix,
    pub requesters: DenseIndex<RequesterId>,
    pub items: DenseIndex<ItemId>,
    pub dropped_events: usize,
}

impl AffinityModel {
    pub fn affinity(&self, requester: RequesterId, item: ItemId) -> f64 {
        match (self.requesters.position(&requester), self.items.position(&item)) {
            (Some(row), Some(col)) => self.matrix.get(row, col),
            _ => 0.0,
        }
    }

    /// `true` when the requester has a row but no recorded affinity at all.
    pub fn is_cold(&self, requester: RequesterId) -> bool {
        self.requesters
            .position(&requester)
            .is_some_and(|row| self.matrix.row(row).iter().all(|value| *value <= 0.0))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MatrixBuilder {
    weights: EventWeights,
}

impl MatrixBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: EventWeights) -> Self {
        Self { weights }
    }

    /// Accumulates every event into a fresh requester × item matrix.
    ///
    /// Returns `None` when either population is empty. Events pointing at a
    /// requester or item outside the populations are skipped and counted in
    /// [`AffinityModel::dropped_events`].
    pub fn build(
        &self,
        requesters: &[RequesterId],
        items: &[ItemId],
        events: &[InteractionEvent],
    ) -> Option<AffinityModel> {
        let requesters = DenseIndex::from_ids(requesters.iter().copied());
        let items = DenseIndex::from_ids(items.iter().copied());
        if requesters.is_empty() || items.is_empty() {
            return None;
        }

        let mut matrix = Matrix::zeros(requesters.len(), items.len());
        let mut dropped_events = 0;
        for event in events {
            match (requesters.position(&event.requester_id), items.position(&event.item_id)) {
                (Some(row), Some(col)) => matrix.add(row, col, self.weights.weight(event.kind)),
                _ => dropped_events += 1,
            }
        }

        Some(AffinityModel { matrix, requesters, items, dropped_events })
    }
}
