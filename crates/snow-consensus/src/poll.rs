//! Poll bookkeeping for the scheduler driving the engines.
//!
//! The engines never run polls themselves; the caller samples peers,
//! collects their preferred vertices here, and feeds the finished result
//! to [`Topological::record_poll`](crate::Topological::record_poll).

use indexmap::IndexMap;
use snow_ids::Id;
use snow_utils::{BitSet, UniqueBag};

use crate::parameters::Parameters;

/// Accumulates the responses of one outstanding network poll.
///
/// Responders are the sampled peers, indexed `0..k` by the sampler.
#[derive(Debug, Clone, Default)]
pub struct Poll {
    pending: BitSet,
    votes: UniqueBag<Id>,
}

impl Poll {
    /// Creates a poll awaiting `num_responders` responses.
    #[must_use]
    pub fn new(num_responders: usize) -> Self {
        let mut pending = BitSet::new();
        for index in 0..num_responders.min(64) {
            pending.add(index);
        }
        Self {
            pending,
            votes: UniqueBag::new(),
        }
    }

    /// Records `responder`'s preferred vertices. Duplicate and
    /// never-sampled responses are dropped.
    pub fn vote(&mut self, responder: usize, vertex_ids: &[Id]) {
        if !self.pending.contains(responder) {
            return;
        }
        self.pending.remove(responder);
        for vertex_id in vertex_ids {
            self.votes.add(responder, *vertex_id);
        }
    }

    /// Gives up on a responder that timed out or disconnected. Its vote
    /// is simply missing from the result.
    pub fn drop_responder(&mut self, responder: usize) {
        self.pending.remove(responder);
    }

    /// Returns `true` once every sampled responder answered or was
    /// dropped.
    #[must_use]
    pub fn finished(&self) -> bool {
        self.pending.is_empty()
    }

    /// Consumes the poll, returning the collected votes.
    #[must_use]
    pub fn result(self) -> UniqueBag<Id> {
        self.votes
    }
}

/// Outstanding polls keyed by request id.
#[derive(Debug, Default)]
pub struct PollSet {
    k: usize,
    concurrent_repolls: usize,
    polls: IndexMap<u32, Poll>,
}

impl PollSet {
    /// Creates an empty set sized by the consensus parameters.
    #[must_use]
    pub fn new(params: &Parameters) -> Self {
        Self {
            k: params.k,
            concurrent_repolls: params.concurrent_repolls,
            polls: IndexMap::new(),
        }
    }

    /// Opens a poll for `request_id` awaiting `k` responders.
    ///
    /// Returns `false` if the request id is already in use.
    pub fn start(&mut self, request_id: u32) -> bool {
        if self.polls.contains_key(&request_id) {
            return false;
        }
        self.polls.insert(request_id, Poll::new(self.k));
        true
    }

    /// Records a response; returns the finished poll's votes once the
    /// last sampled responder has answered.
    pub fn vote(
        &mut self,
        request_id: u32,
        responder: usize,
        vertex_ids: &[Id],
    ) -> Option<UniqueBag<Id>> {
        let poll = self.polls.get_mut(&request_id)?;
        poll.vote(responder, vertex_ids);
        self.finish(request_id)
    }

    /// Drops a responder from an outstanding poll; returns the finished
    /// poll's votes if it was the last one pending.
    pub fn drop_responder(
        &mut self,
        request_id: u32,
        responder: usize,
    ) -> Option<UniqueBag<Id>> {
        let poll = self.polls.get_mut(&request_id)?;
        poll.drop_responder(responder);
        self.finish(request_id)
    }

    fn finish(&mut self, request_id: u32) -> Option<UniqueBag<Id>> {
        if self.polls.get(&request_id)?.finished() {
            self.polls.shift_remove(&request_id).map(Poll::result)
        } else {
            None
        }
    }

    /// Returns the number of outstanding polls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.polls.len()
    }

    /// Returns `true` if no polls are outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.polls.is_empty()
    }

    /// True when fewer polls are outstanding than undecided items need to
    /// finalize.
    #[must_use]
    pub fn should_repoll(&self) -> bool {
        self.polls.len() < self.concurrent_repolls
    }
}
