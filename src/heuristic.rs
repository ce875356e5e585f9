use crate::error::Result;

pub trait Heuristic {
    fn name(&self) -> &str;

    fn max_depth(&self) -> Option<u32>;

    fn heuristic(&self, state: &[u8]) -> Result<u32>;

    fn seek_calls(&self) -> u64 {
        0
    }

    fn reset_seek_calls(&self) {}
}

#[derive(Default)]
pub struct HeuristicAggregator<'a> {
    sources: Vec<&'a dyn Heuristic>,
}

impl<'a> HeuristicAggregator<'a> {
    pub fn new() -> HeuristicAggregator<'a> {
        HeuristicAggregator { sources: vec![] }
    }

    pub fn push(&mut self, source: &'a dyn Heuristic) {
        self.sources.push(source);
    }

    // evaluated before every other source
    pub fn push_front(&mut self, source: &'a dyn Heuristic) {
        self.sources.insert(0, source);
    }

    pub fn sources(&self) -> &[&'a dyn Heuristic] {
        &self.sources
    }

    pub fn estimate(&self, state: &[u8]) -> Result<u32> {
        self.estimate_bounded(state, None)
    }

    // Like `estimate`, but stops as soon as the running maximum reaches
    // `max_acceptable`: the full estimate can only be larger still.
    pub fn estimate_bounded(&self, state: &[u8], max_acceptable: Option<u32>) -> Result<u32> {
        let mut cost_to_goal = 0;

        for source in &self.sources {
            if max_acceptable.map_or(false, |max| cost_to_goal >= max) {
                break;
            }

            // If there is no way this source will have a higher cost than the
            // ones we have already examined do not bother looking it up
            if source.max_depth().map_or(false, |depth| cost_to_goal >= depth) {
                continue;
            }

            cost_to_goal = cost_to_goal.max(source.heuristic(state)?);
        }

        Ok(cost_to_goal)
    }
}
