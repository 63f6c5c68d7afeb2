//! PDU outlet table
//!
//! Outlets are announced the same way as sensor devices (a count, then one
//! `@id` per position) but never move, so a count message simply rebuilds
//! the table.

use crate::error::{Nm2Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outlet {
    /// Full topic of the outlet, `mbdetnrs/1.0/powerDistributions/1/outlets/<key>`
    pub topic: Option<String>,
    pub switchable: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct OutletRegistry {
    outlets: Vec<Outlet>,
    max_outlets: usize,
}

impl OutletRegistry {
    pub fn new(max_outlets: usize) -> Self {
        Self {
            outlets: Vec::new(),
            max_outlets,
        }
    }

    pub fn len(&self) -> usize {
        self.outlets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outlets.is_empty()
    }

    /// Discard every outlet and allocate `count` empty slots
    pub fn init(&mut self, count: usize) -> Result<()> {
        if count > self.max_outlets {
            return Err(Nm2Error::CapacityExceeded {
                requested: count,
                limit: self.max_outlets,
            });
        }
        self.outlets = vec![Outlet::default(); count];
        Ok(())
    }

    pub fn set_topic(&mut self, index: usize, topic: &str) -> Result<()> {
        if topic.is_empty() {
            return Err(Nm2Error::EmptyKey);
        }
        let len = self.outlets.len();
        let outlet = self
            .outlets
            .get_mut(index)
            .ok_or(Nm2Error::OutOfBounds { index, len })?;
        outlet.topic = Some(topic.to_string());
        Ok(())
    }

    pub fn set_switchable(&mut self, index: usize, switchable: bool) -> Result<()> {
        let len = self.outlets.len();
        let outlet = self
            .outlets
            .get_mut(index)
            .ok_or(Nm2Error::OutOfBounds { index, len })?;
        outlet.switchable = Some(switchable);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&Outlet> {
        self.outlets.get(index)
    }

    pub fn find_by_topic(&self, topic: &str) -> Result<usize> {
        self.outlets
            .iter()
            .position(|o| o.topic.as_deref() == Some(topic))
            .ok_or_else(|| Nm2Error::OutletNotFound(topic.to_string()))
    }
}
