pub mod clock;
pub mod fingerprint;
pub mod schedule;
pub mod serde_duration;

/// Frame-indexed history of states with rewind/forward and branch-on-record.
///
/// `limit` bounds how many states are retained; the oldest frames are
/// dropped first so long headless runs don't grow without bound.
#[derive(Debug, Clone)]
pub struct TimeMachine<State> {
    states: Vec<State>,
    frame: usize,
    base_frame: usize,
    limit: Option<usize>,
}

impl<State> TimeMachine<State> {
    pub fn new(initial_state: State) -> Self {
        Self {
            states: vec![initial_state],
            frame: 0,
            base_frame: 0,
            limit: None,
        }
    }

    pub fn with_limit(initial_state: State, limit: usize) -> Self {
        let mut tm = Self::new(initial_state);
        tm.limit = Some(limit.max(1));
        tm
    }

    /// Absolute frame number, counting frames that were trimmed away.
    pub fn frame(&self) -> usize {
        self.base_frame + self.frame
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn state(&self) -> &State {
        &self.states[self.frame]
    }

    pub fn state_at(&self, frame: usize) -> Option<&State> {
        frame
            .checked_sub(self.base_frame)
            .and_then(|idx| self.states.get(idx))
    }

    pub fn history(&self) -> &[State] {
        &self.states
    }

    pub fn can_rewind(&self) -> bool {
        self.frame > 0
    }

    pub fn can_forward(&self) -> bool {
        self.frame + 1 < self.states.len()
    }

    pub fn rewind(&mut self, frames: usize) -> usize {
        self.frame = self.frame.saturating_sub(frames);
        self.frame()
    }

    pub fn forward(&mut self, frames: usize) -> usize {
        let max_frame = self.states.len().saturating_sub(1);
        self.frame = self.frame.saturating_add(frames).min(max_frame);
        self.frame()
    }

    pub fn record(&mut self, state: State) -> usize {
        if self.frame + 1 < self.states.len() {
            self.states.truncate(self.frame + 1);
        }
        self.states.push(state);
        self.frame += 1;

        if let Some(limit) = self.limit {
            let excess = self.states.len().saturating_sub(limit);
            if excess > 0 {
                self.states.drain(..excess);
                self.frame -= excess;
                self.base_frame += excess;
            }
        }
        self.frame()
    }

    pub fn reset(&mut self, initial_state: State) {
        self.states.clear();
        self.states.push(initial_state);
        self.frame = 0;
        self.base_frame = 0;
    }
}

/// Deterministic game rules: a pure transition from one state and one input
/// to the next state.
pub trait GameLogic {
    type State;
    type Input;

    fn initial_state(&self) -> Self::State;
    fn step(&self, state: &Self::State, input: Self::Input) -> Self::State;
}

#[derive(Debug)]
pub struct HeadlessRunner<G: GameLogic> {
    game: G,
    timemachine: TimeMachine<G::State>,
}

impl<G: GameLogic> HeadlessRunner<G> {
    pub fn new(game: G) -> Self {
        let initial_state = game.initial_state();
        Self {
            game,
            timemachine: TimeMachine::new(initial_state),
        }
    }

    pub fn with_history_limit(game: G, limit: usize) -> Self {
        let initial_state = game.initial_state();
        Self {
            game,
            timemachine: TimeMachine::with_limit(initial_state, limit),
        }
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn frame(&self) -> usize {
        self.timemachine.frame()
    }

    pub fn state(&self) -> &G::State {
        self.timemachine.state()
    }

    pub fn history(&self) -> &[G::State] {
        self.timemachine.history()
    }

    pub fn timemachine(&self) -> &TimeMachine<G::State> {
        &self.timemachine
    }

    pub fn step(&mut self, input: G::Input) -> usize {
        let next_state = self.game.step(self.timemachine.state(), input);
        self.timemachine.record(next_state)
    }

    pub fn run<I>(&mut self, inputs: I) -> usize
    where
        I: IntoIterator<Item = G::Input>,
    {
        let mut last_frame = self.frame();
        for input in inputs {
            last_frame = self.step(input);
        }
        last_frame
    }

    pub fn rewind(&mut self, frames: usize) -> usize {
        self.timemachine.rewind(frames)
    }

    pub fn forward(&mut self, frames: usize) -> usize {
        self.timemachine.forward(frames)
    }

    pub fn reset(&mut self) {
        let initial_state = self.game.initial_state();
        self.timemachine.reset(initial_state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Additive;

    impl GameLogic for Additive {
        type State = i32;
        type Input = i32;

        fn initial_state(&self) -> Self::State {
            0
        }

        fn step(&self, state: &Self::State, input: Self::Input) -> Self::State {
            *state + input
        }
    }

    #[test]
    fn timemachine_rewind_and_branch() {
        let mut tm = TimeMachine::new(0);
        tm.record(1);
        tm.record(2);
        assert_eq!(tm.state(), &2);

        tm.rewind(1);
        assert_eq!(tm.state(), &1);

        tm.record(99);
        assert_eq!(tm.history(), &[0, 1, 99]);
        assert_eq!(tm.frame(), 2);
    }

    #[test]
    fn timemachine_limit_drops_oldest_frames_but_keeps_absolute_frame() {
        let mut tm = TimeMachine::with_limit(0, 3);
        for v in 1..=5 {
            tm.record(v);
        }

        assert_eq!(tm.history(), &[3, 4, 5]);
        assert_eq!(tm.frame(), 5);
        assert_eq!(tm.state_at(4), Some(&4));
        assert_eq!(tm.state_at(1), None);

        assert_eq!(tm.rewind(10), 3);
        assert_eq!(tm.state(), &3);
    }

    #[test]
    fn runner_steps_and_seeks() {
        let mut runner = HeadlessRunner::new(Additive);
        runner.run([1, 2, 3]);
        assert_eq!(runner.frame(), 3);
        assert_eq!(runner.state(), &6);

        runner.rewind(2);
        assert_eq!(runner.state(), &1);

        runner.forward(1);
        assert_eq!(runner.state(), &3);
    }

    #[test]
    fn runner_reset_restores_initial_state() {
        let mut runner = HeadlessRunner::new(Additive);
        runner.run([4, 5]);
        runner.reset();

        assert_eq!(runner.frame(), 0);
        assert_eq!(runner.state(), &0);
        assert_eq!(runner.history().len(), 1);
    }
}
