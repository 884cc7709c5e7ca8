//! 2D fallback avatar used when the 3D pipeline is unavailable.
//!
//! Presents the same four-state contract as the scene path as a ring, two eyes
//! and a mouth. Timing mirrors the CSS keyframes in `FALLBACK_STYLESHEET` so a
//! web host can either render the classes directly or draw from `FallbackView`.

use std::f32::consts::TAU;

use serde::Serialize;

use crate::blink::pulse_value;
use crate::state::{AnimationState, BadgeColor};
use crate::synth::speech_active;

/// Seconds between fallback blinks (`fb-blink` animation period).
pub const FALLBACK_BLINK_INTERVAL: f32 = 4.0;
/// Length of one fallback blink.
pub const FALLBACK_BLINK_DURATION: f32 = 0.15;
/// Period of the talking mouth pulse (`fb-talk`).
pub const FALLBACK_TALK_PERIOD: f32 = 0.3;
/// Period of each thinking dot (`fb-dot`), and the stagger between dots.
pub const FALLBACK_DOT_PERIOD: f32 = 1.4;
pub const FALLBACK_DOT_STAGGER: f32 = 0.2;

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum MouthShape {
    Smile,
    Neutral,
    /// Open amount in [0, 1], pulsing while audio plays.
    Talking { open: f32 },
    Pursed,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Gaze {
    Center,
    Forward,
    Up,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct RingStyle {
    pub color: BadgeColor,
    pub pulsing: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FallbackView {
    pub state: AnimationState,
    pub speaking: bool,
    pub ring: RingStyle,
    /// 1 = fully open, 0 = closed.
    pub eye_openness: f32,
    pub gaze: Gaze,
    pub mouth: MouthShape,
    /// Opacity of the three thinking dots, present only while thinking.
    pub thinking_dots: Option<[f32; 3]>,
    pub classes: Vec<&'static str>,
}

/// Stateless apart from its clock; every view is a function of time and props.
#[derive(Debug, Default)]
pub struct FallbackRenderer {
    time: f64,
}

impl FallbackRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.time = 0.0;
    }

    pub fn advance(&mut self, dt: f32, state: AnimationState, speaking: bool) -> FallbackView {
        self.time += f64::from(dt.max(0.0));
        view_at(self.time as f32, state, speaking)
    }
}

fn fallback_blink(time: f32) -> f32 {
    let phase = time % FALLBACK_BLINK_INTERVAL;
    let start = FALLBACK_BLINK_INTERVAL - FALLBACK_BLINK_DURATION;
    if phase >= start {
        pulse_value((phase - start) / FALLBACK_BLINK_DURATION)
    } else {
        0.0
    }
}

fn talk_open(time: f32) -> f32 {
    (0.55 + 0.45 * (TAU * time / FALLBACK_TALK_PERIOD).sin()).clamp(0.1, 1.0)
}

fn dot_opacity(time: f32, i: usize) -> f32 {
    let t = time - i as f32 * FALLBACK_DOT_STAGGER;
    0.3 + 0.7 * (0.5 - 0.5 * (TAU * t / FALLBACK_DOT_PERIOD).cos())
}

/// The fallback view for a point in time.
pub fn view_at(time: f32, state: AnimationState, speaking: bool) -> FallbackView {
    let talking = speech_active(state, speaking);
    let (color, pulsing, gaze, mouth) = match state {
        AnimationState::Idle => (BadgeColor::Gray, false, Gaze::Center, MouthShape::Smile),
        AnimationState::Speaking if talking => (
            BadgeColor::Blue,
            true,
            Gaze::Center,
            MouthShape::Talking { open: talk_open(time) },
        ),
        AnimationState::Speaking => (BadgeColor::Blue, false, Gaze::Center, MouthShape::Neutral),
        AnimationState::Listening => (BadgeColor::Green, true, Gaze::Forward, MouthShape::Neutral),
        AnimationState::Thinking => (BadgeColor::Yellow, false, Gaze::Up, MouthShape::Pursed),
    };
    let thinking_dots = (state == AnimationState::Thinking)
        .then(|| [dot_opacity(time, 0), dot_opacity(time, 1), dot_opacity(time, 2)]);

    let mut classes = vec!["avatar-fallback", state_class(state), ring_class(color)];
    if pulsing {
        classes.push("fb-pulse");
    }
    classes.push(match mouth {
        MouthShape::Smile => "fb-mouth-smile",
        MouthShape::Neutral => "fb-mouth-neutral",
        MouthShape::Talking { .. } => "fb-mouth-talking",
        MouthShape::Pursed => "fb-mouth-pursed",
    });
    if gaze == Gaze::Up {
        classes.push("fb-gaze-up");
    }
    if thinking_dots.is_some() {
        classes.push("fb-dots");
    }

    FallbackView {
        state,
        speaking,
        ring: RingStyle { color, pulsing },
        eye_openness: 1.0 - fallback_blink(time),
        gaze,
        mouth,
        thinking_dots,
        classes,
    }
}

fn state_class(state: AnimationState) -> &'static str {
    match state {
        AnimationState::Idle => "fb-idle",
        AnimationState::Speaking => "fb-speaking",
        AnimationState::Listening => "fb-listening",
        AnimationState::Thinking => "fb-thinking",
    }
}

fn ring_class(color: BadgeColor) -> &'static str {
    match color {
        BadgeColor::Gray => "fb-ring-gray",
        BadgeColor::Blue => "fb-ring-blue",
        BadgeColor::Green => "fb-ring-green",
        BadgeColor::Yellow => "fb-ring-yellow",
    }
}

/// Keyframes and classes matching `view_at` timing.
pub const FALLBACK_STYLESHEET: &str = r#".avatar-fallback { position: relative; width: 12rem; height: 12rem; border-radius: 9999px; border: 6px solid; display: flex; align-items: center; justify-content: center; }
.fb-ring-gray { border-color: #6b7280; }
.fb-ring-blue { border-color: #3b82f6; }
.fb-ring-green { border-color: #22c55e; }
.fb-ring-yellow { border-color: #eab308; }
.fb-pulse { animation: fb-pulse 1.2s ease-in-out infinite; }
.avatar-fallback .fb-eye { animation: fb-blink 4s linear infinite; }
.fb-gaze-up .fb-eye { transform: translateY(-0.25rem); }
.fb-mouth-talking .fb-mouth { animation: fb-talk 0.3s ease-in-out infinite; }
.fb-mouth-smile .fb-mouth { border-radius: 0 0 9999px 9999px; height: 0.6rem; }
.fb-mouth-neutral .fb-mouth { height: 0.2rem; }
.fb-mouth-pursed .fb-mouth { width: 0.8rem; height: 0.4rem; border-radius: 9999px; }
.fb-dots .fb-dot { animation: fb-dot 1.4s ease-in-out infinite; }
.fb-dots .fb-dot:nth-child(2) { animation-delay: 0.2s; }
.fb-dots .fb-dot:nth-child(3) { animation-delay: 0.4s; }
@keyframes fb-pulse { 0%, 100% { transform: scale(1); } 50% { transform: scale(1.04); } }
@keyframes fb-blink { 0%, 96.25% { transform: scaleY(1); } 98.1% { transform: scaleY(0.05); } 100% { transform: scaleY(1); } }
@keyframes fb-talk { 0%, 100% { transform: scaleY(0.3); } 50% { transform: scaleY(1); } }
@keyframes fb-dot { 0%, 100% { opacity: 0.3; } 50% { opacity: 1; } }
"#;
