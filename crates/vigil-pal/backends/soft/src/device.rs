use std::collections::VecDeque;

use api::{
    resource::{ResourceId, Subresource},
    tracking::{Barrier, SubresourceState},
    types::{QueueType, ResourceState},
};
use rustc_hash::FxHashMap;
use thiserror::Error;
use vigil_log::{error, VALIDATION_TARGET};

use crate::command_list::SoftCommand;

/// Something the device executed, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutedOp {
    Barrier {
        queue: QueueType,
        barrier: Barrier,
    },
    Command {
        queue: QueueType,
        name: &'static str,
    },
    Wait {
        queue: QueueType,
        on: QueueType,
        value: u64,
    },
}

/// A mistake that real hardware would not report, but would misbehave on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{resource:?} is not alive on this device")]
    UnknownResource { resource: ResourceId },
    #[error(
        "transition of {resource:?} subresource {subresource} expected {expected:?} but the \
        subresource is in {actual:?}"
    )]
    StateMismatch {
        resource: ResourceId,
        subresource: u32,
        expected: ResourceState,
        actual: ResourceState,
    },
    #[error("transition of {resource:?} {subresource:?} from and to {state:?}")]
    RedundantTransition {
        resource: ResourceId,
        subresource: Subresource,
        state: ResourceState,
    },
    #[error(
        "`{command}` requires {resource:?} subresource {subresource} in {required:?} but it is in \
        {actual:?}"
    )]
    MissingState {
        command: &'static str,
        resource: ResourceId,
        subresource: u32,
        required: ResourceState,
        actual: ResourceState,
    },
    #[error("command list recorded for the {list:?} queue was executed on the {queue:?} queue")]
    WrongQueue { list: QueueType, queue: QueueType },
    #[error("{queue:?} queue waits for {on:?} to reach {value}, which was never submitted")]
    UnsignalledWait {
        queue: QueueType,
        on: QueueType,
        value: u64,
    },
}

/// The true state of every live resource on the device.
pub(crate) struct Device {
    resources: FxHashMap<ResourceId, DeviceResource>,
    /// The most recent `history_limit` executed operations.
    history: VecDeque<ExecutedOp>,
    history_limit: usize,
    errors: Vec<ValidationError>,
}

struct DeviceResource {
    subresources: u32,
    states: SubresourceState,
}

impl Device {
    pub fn new(history_limit: usize) -> Self {
        Self {
            resources: FxHashMap::default(),
            history: VecDeque::default(),
            history_limit,
            errors: Vec::default(),
        }
    }

    pub fn register(&mut self, id: ResourceId, subresources: u32, state: ResourceState) {
        self.resources.insert(
            id,
            DeviceResource {
                subresources,
                states: SubresourceState::new(state),
            },
        );
    }

    #[inline(always)]
    pub fn unregister(&mut self, id: ResourceId) {
        self.resources.remove(&id);
    }

    #[inline(always)]
    pub fn live_resources(&self) -> usize {
        self.resources.len()
    }

    pub fn state(&self, id: ResourceId, subresource: u32) -> Option<ResourceState> {
        self.resources
            .get(&id)
            .map(|resource| resource.states.get(Subresource::Index(subresource)))
    }

    #[inline(always)]
    pub fn history(&self) -> &VecDeque<ExecutedOp> {
        &self.history
    }

    #[inline(always)]
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    #[inline(always)]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    #[inline(always)]
    pub fn take_errors(&mut self) -> Vec<ValidationError> {
        std::mem::take(&mut self.errors)
    }

    fn record(&mut self, op: ExecutedOp) {
        if self.history_limit == 0 {
            return;
        }
        if self.history.len() == self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(op);
    }

    pub fn report(&mut self, err: ValidationError) {
        error!(target: VALIDATION_TARGET, "{err}");
        self.errors.push(err);
    }

    pub fn apply_barrier(&mut self, queue: QueueType, barrier: &Barrier) {
        self.record(ExecutedOp::Barrier {
            queue,
            barrier: *barrier,
        });

        let mut errors = Vec::default();
        match *barrier {
            Barrier::Transition {
                resource,
                subresource,
                before,
                after,
            } => {
                if before == after {
                    errors.push(ValidationError::RedundantTransition {
                        resource,
                        subresource,
                        state: before,
                    });
                }

                match self.resources.get_mut(&resource) {
                    Some(live) => {
                        for (idx, actual) in live.range(subresource) {
                            if actual != before {
                                errors.push(ValidationError::StateMismatch {
                                    resource,
                                    subresource: idx,
                                    expected: before,
                                    actual,
                                });
                            }
                        }
                        live.states.set(subresource, after);
                    }
                    None => errors.push(ValidationError::UnknownResource { resource }),
                }
            }
            Barrier::UnorderedAccess { .. } | Barrier::Aliasing { .. } => {
                for resource in barrier.resources() {
                    if !self.resources.contains_key(&resource) {
                        errors.push(ValidationError::UnknownResource { resource });
                    }
                }
            }
        }

        for err in errors {
            self.report(err);
        }
    }

    /// Checks that every subresource the command accesses is in a state that includes the
    /// required one.
    pub fn access(&mut self, queue: QueueType, command: &SoftCommand) {
        self.record(ExecutedOp::Command {
            queue,
            name: command.name,
        });

        let mut errors = Vec::default();
        for access in &command.accesses {
            match self.resources.get(&access.resource) {
                Some(live) => {
                    for (idx, actual) in live.range(access.subresource) {
                        if !actual.contains(access.required) {
                            errors.push(ValidationError::MissingState {
                                command: command.name,
                                resource: access.resource,
                                subresource: idx,
                                required: access.required,
                                actual,
                            });
                        }
                    }
                }
                None => errors.push(ValidationError::UnknownResource {
                    resource: access.resource,
                }),
            }
        }

        for err in errors {
            self.report(err);
        }
    }

    #[inline(always)]
    pub fn wait(&mut self, queue: QueueType, on: QueueType, value: u64) {
        self.record(ExecutedOp::Wait { queue, on, value });
    }
}

impl DeviceResource {
    /// The states of the subresources selected by `subresource`.
    fn range(&self, subresource: Subresource) -> impl Iterator<Item = (u32, ResourceState)> + '_ {
        let (start, end) = match subresource {
            Subresource::All => (0, self.subresources),
            Subresource::Index(idx) => (idx, (idx + 1).min(self.subresources)),
        };
        (start..end).map(move |idx| (idx, self.states.get(Subresource::Index(idx))))
    }
}
