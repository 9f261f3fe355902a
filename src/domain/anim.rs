/// Frame animation driven by its own low-frequency clock.
///
/// The mode (idle/walk) is sampled from the owner's mover on each animation
/// tick only. Switching sets keeps the frame index, clamped into the new set.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AnimMode {
    Idle,
    Walk,
}

/// Named frames for one actor kind. Both sets are non-empty.
#[derive(Clone, Copy, Debug)]
pub struct FrameSet {
    pub idle: &'static [&'static str],
    pub walk: &'static [&'static str],
}

const FALLBACK_IDLE: &[&str] = &["hero_idle_0"];

impl FrameSet {
    /// Empty walk falls back to idle; empty idle to a single default frame.
    pub const fn new(idle: &'static [&'static str], walk: &'static [&'static str]) -> Self {
        let idle = if idle.is_empty() { FALLBACK_IDLE } else { idle };
        let walk = if walk.is_empty() { idle } else { walk };
        FrameSet { idle, walk }
    }

    pub fn frames(&self, mode: AnimMode) -> &'static [&'static str] {
        match mode {
            AnimMode::Idle => self.idle,
            AnimMode::Walk => self.walk,
        }
    }
}

pub const HERO_FRAMES: FrameSet = FrameSet::new(
    &["hero_idle_0", "hero_idle_1", "hero_idle_2", "hero_idle_3"],
    &["hero_walk_0", "hero_walk_1", "hero_walk_2", "hero_walk_3"],
);

pub const SLIME_FRAMES: FrameSet = FrameSet::new(
    &["slime_idle_0", "slime_idle_1", "slime_idle_2"],
    &["slime_walk_0", "slime_walk_1", "slime_walk_2", "slime_walk_3"],
);

#[derive(Clone, Debug)]
pub struct AnimationState {
    frames: FrameSet,
    mode: AnimMode,
    frame_index: usize,
}

impl AnimationState {
    pub fn new(frames: FrameSet) -> Self {
        AnimationState { frames, mode: AnimMode::Idle, frame_index: 0 }
    }

    pub fn mode(&self) -> AnimMode {
        self.mode
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn frame_name(&self) -> &'static str {
        self.frames.frames(self.mode)[self.frame_index]
    }

    /// One animation tick. `moving` is the owner's mover state right now.
    pub fn tick(&mut self, moving: bool) {
        let mode = if moving { AnimMode::Walk } else { AnimMode::Idle };
        let len = self.frames.frames(mode).len();
        if mode != self.mode {
            self.mode = mode;
            self.frame_index %= len;
        }
        self.frame_index = (self.frame_index + 1) % len;
    }
}
