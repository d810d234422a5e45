//! Load cycle bookkeeping and progressive merge.
//!
//! `DataLoader` owns the current `DataPacket`. It never performs I/O itself:
//! `begin` plans the requests of a new cycle, `accept` merges one response.
//! The caller runs the requests and feeds the responses back in, in any order.

use crate::error::LoadResult;
use crate::plan::{plan_requests, DataRequest};
use dashgrid_core::{Channel, ChannelData, DataPacket, LoadStatus, TimeRange};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

/// Completion callback of one `load()` call.
pub type OnComplete = Box<dyn FnOnce(LoadStatus) + Send>;

/// Finished load whose callback has not been run yet.
///
/// Returned instead of invoked so the caller can redraw first.
pub struct Completion {
    pub generation: u64,
    pub status: LoadStatus,
    callback: OnComplete,
}

impl Completion {
    /// Run the completion callback with the final status.
    pub fn finish(self) {
        (self.callback)(self.status);
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("generation", &self.generation)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Result of starting a load.
#[derive(Debug)]
pub enum LoadStart {
    /// Every required channel is already loaded; no request is needed.
    Ready(Completion),
    /// Requests to run; each response goes back through `accept`.
    Pending {
        generation: u64,
        requests: Vec<DataRequest>,
    },
}

/// One chunk response as fed back by the request runner.
#[derive(Debug)]
pub struct ChunkResponse {
    pub generation: u64,
    /// Channels this chunk was asked for.
    pub channels: Vec<Channel>,
    pub result: LoadResult<ChannelData>,
}

/// What accepting a chunk changed.
#[derive(Debug)]
pub struct ChunkOutcome {
    /// The response belonged to the current cycle and was merged.
    pub merged: bool,
    /// Set when this response resolved the last pending chunk of its cycle.
    pub completed: Option<Completion>,
}

struct LoadCycle {
    pending: usize,
    status: Option<LoadStatus>,
    on_complete: OnComplete,
}

impl LoadCycle {
    fn record(&mut self, status: LoadStatus) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }
}

/// Owner of the current packet and of all in-flight load cycles.
pub struct DataLoader {
    packet: DataPacket,
    generation: u64,
    cycles: HashMap<u64, LoadCycle>,
}

impl DataLoader {
    /// Start with an empty, settled packet for `range`.
    pub fn new(range: TimeRange) -> Self {
        Self {
            packet: DataPacket::empty(range),
            generation: 0,
            cycles: HashMap::new(),
        }
    }

    pub fn packet(&self) -> &DataPacket {
        &self.packet
    }

    pub fn range(&self) -> TimeRange {
        self.packet.range
    }

    /// Generation of the most recent `begin`.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of cycles (current or superseded) still waiting for responses.
    pub fn in_flight(&self) -> usize {
        self.cycles.len()
    }

    /// Start a new load cycle.
    ///
    /// With `Some(range)` the packet is reset to an empty transitional packet
    /// for that range; with `None` the current range and data are kept and
    /// only channels not yet present are requested.
    pub fn begin<'a, I>(&mut self, range: Option<TimeRange>, required: I, on_complete: OnComplete) -> LoadStart
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.generation += 1;
        let generation = self.generation;

        if let Some(range) = range {
            self.packet = DataPacket::pending(range);
        }

        let missing = self.packet.missing(required);
        if missing.is_empty() {
            self.packet.is_transitional = false;
            debug!(generation, "All required channels present, no request needed");
            return LoadStart::Ready(Completion {
                generation,
                status: LoadStatus::ok(),
                callback: on_complete,
            });
        }

        let requests = plan_requests(&self.packet.range, &missing);
        self.packet.is_transitional = true;
        info!(
            generation,
            range = %self.packet.range,
            channels = missing.len(),
            requests = requests.len(),
            "Load cycle started"
        );

        self.cycles.insert(
            generation,
            LoadCycle {
                pending: requests.len(),
                status: None,
                on_complete,
            },
        );

        LoadStart::Pending {
            generation,
            requests,
        }
    }

    /// Merge one chunk response.
    ///
    /// Responses of superseded cycles are not merged, but still count toward
    /// their own cycle's completion.
    pub fn accept(&mut self, response: ChunkResponse) -> ChunkOutcome {
        let ChunkResponse {
            generation,
            channels,
            result,
        } = response;

        let Some(cycle) = self.cycles.get_mut(&generation) else {
            warn!(generation, "Response for unknown load cycle dropped");
            return ChunkOutcome {
                merged: false,
                completed: None,
            };
        };

        let current = generation == self.generation;
        match result {
            Ok(mut data) => {
                if current {
                    for channel in &channels {
                        match data.remove(channel) {
                            Some(series) => {
                                self.packet.data.insert(channel.clone(), series);
                            }
                            None => debug!(%channel, "Channel absent from response"),
                        }
                    }
                } else {
                    debug!(generation, current = self.generation, "Stale response discarded");
                }
            }
            Err(e) => {
                warn!(generation, ?channels, error = %e, "Chunk request failed");
                cycle.record(e.status());
            }
        }

        cycle.pending = cycle.pending.saturating_sub(1);
        let completed = if cycle.pending == 0 {
            self.cycles.remove(&generation).map(|cycle| {
                let status = cycle.status.unwrap_or_else(LoadStatus::ok);
                if current {
                    self.packet.is_transitional = false;
                }
                info!(generation, %status, "Load cycle completed");
                Completion {
                    generation,
                    status,
                    callback: cycle.on_complete,
                }
            })
        } else {
            None
        };

        ChunkOutcome {
            merged: current,
            completed,
        }
    }
}
