//! Time-sliced property interpolation.
//!
//! A [`Tweener`] drives any number of tweens, each addressed by a
//! [`TweenKey`] (what object, which property). Starting a tween on a key that
//! is already animating replaces the running one: the newest caller wins and
//! the replaced tween's completion payload is dropped, never delivered.
//!
//! Tweens do not own the values they animate. Every [`Tweener::advance`] call
//! writes through an [`Animatable`], and completions come back as plain values
//! of type `C` for the caller to apply.

use glam::Vec3;
use hecs::Entity;

/// Easing curves. Power curves follow the usual naming where `Power1` is
/// quadratic, `Power2` cubic, `Power3` quartic and `Power4` quintic.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Easing {
    /// Constant speed throughout.
    #[default]
    Linear,
    /// Cubic deceleration.
    Power2Out,
    /// Quartic ease at both ends.
    Power3InOut,
    /// Quintic deceleration.
    Power4Out,
    /// Quintic ease at both ends.
    Power4InOut,
    /// Decelerates past the target and settles back. The value is the overshoot.
    BackOut(f32),
}

impl Easing {
    /// Apply the easing function to a linear progress value (0.0 to 1.0).
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match *self {
            Easing::Linear => t,
            Easing::Power2Out => power_out(t, 3),
            Easing::Power3InOut => power_in_out(t, 4),
            Easing::Power4Out => power_out(t, 5),
            Easing::Power4InOut => power_in_out(t, 5),
            Easing::BackOut(overshoot) => {
                let u = t - 1.0;
                1.0 + (overshoot + 1.0) * u * u * u + overshoot * u * u
            }
        }
    }
}

fn power_out(t: f32, power: i32) -> f32 {
    1.0 - (1.0 - t).powi(power)
}

fn power_in_out(t: f32, power: i32) -> f32 {
    if t < 0.5 {
        2f32.powi(power - 1) * t.powi(power)
    } else {
        1.0 - (-2.0 * t + 2.0).powi(power) / 2.0
    }
}

/// Object a tween writes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    Camera,
    Entity(Entity),
}

/// Property of a [`Target`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Position,
    PositionX,
    PositionY,
    Scale,
    /// Camera pitch and yaw, packed into x and y.
    Look,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TweenKey {
    pub target: Target,
    pub channel: Channel,
}

impl TweenKey {
    pub fn new(target: Target, channel: Channel) -> Self {
        Self { target, channel }
    }

    pub fn camera(channel: Channel) -> Self {
        Self::new(Target::Camera, channel)
    }

    pub fn entity(entity: Entity, channel: Channel) -> Self {
        Self::new(Target::Entity(entity), channel)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TweenValue {
    Scalar(f32),
    Vector(Vec3),
}

impl TweenValue {
    /// Interpolate toward `to`. Mismatched kinds snap to `to`.
    pub fn lerp(self, to: TweenValue, t: f32) -> TweenValue {
        match (self, to) {
            (TweenValue::Scalar(a), TweenValue::Scalar(b)) => TweenValue::Scalar(a + (b - a) * t),
            (TweenValue::Vector(a), TweenValue::Vector(b)) => TweenValue::Vector(a.lerp(b, t)),
            (_, to) => to,
        }
    }
}

/// Read/write access to the properties tweens animate.
pub trait Animatable {
    fn read(&self, key: TweenKey) -> Option<TweenValue>;
    fn write(&mut self, key: TweenKey, value: TweenValue);
}

struct Tween<C> {
    key: TweenKey,
    from: TweenValue,
    to: TweenValue,
    duration: f32,
    elapsed: f32,
    easing: Easing,
    on_complete: Option<C>,
}

/// Drives tweens and hands back completion payloads.
pub struct Tweener<C> {
    tweens: Vec<Tween<C>>,
}

impl<C> Default for Tweener<C> {
    fn default() -> Self {
        Self { tweens: Vec::new() }
    }
}

impl<C> Tweener<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start animating `key` from `from` to `to`.
    ///
    /// Any tween already running on `key` is discarded together with its
    /// completion.
    pub fn start(
        &mut self,
        key: TweenKey,
        from: TweenValue,
        to: TweenValue,
        duration: f32,
        easing: Easing,
        on_complete: Option<C>,
    ) {
        if self.kill(key) {
            tracing::trace!(?key, "tween overwritten");
        }
        self.tweens.push(Tween {
            key,
            from,
            to,
            duration: duration.max(0.0),
            elapsed: 0.0,
            easing,
            on_complete,
        });
    }

    /// Stop the tween on `key`, leaving the property where it is.
    pub fn kill(&mut self, key: TweenKey) -> bool {
        let before = self.tweens.len();
        self.tweens.retain(|t| t.key != key);
        self.tweens.len() != before
    }

    /// Stop every tween on `target`.
    pub fn kill_tweens_of(&mut self, target: Target) -> usize {
        let before = self.tweens.len();
        self.tweens.retain(|t| t.key.target != target);
        before - self.tweens.len()
    }

    pub fn is_tweening(&self, key: TweenKey) -> bool {
        self.tweens.iter().any(|t| t.key == key)
    }

    pub fn active(&self) -> usize {
        self.tweens.len()
    }

    /// Step every tween by `dt` seconds.
    ///
    /// Finished tweens write exactly their end value and their completions are
    /// returned in start order.
    pub fn advance(&mut self, dt: f32, stage: &mut impl Animatable) -> Vec<C> {
        let mut completed = Vec::new();
        let mut i = 0;
        while i < self.tweens.len() {
            let tween = &mut self.tweens[i];
            tween.elapsed += dt.max(0.0);
            let progress = if tween.duration <= f32::EPSILON {
                1.0
            } else {
                tween.elapsed / tween.duration
            };

            if progress >= 1.0 {
                stage.write(tween.key, tween.to);
                let tween = self.tweens.remove(i);
                if let Some(done) = tween.on_complete {
                    completed.push(done);
                }
            } else {
                let eased = tween.easing.apply(progress);
                stage.write(tween.key, tween.from.lerp(tween.to, eased));
                i += 1;
            }
        }
        completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Values(HashMap<TweenKey, TweenValue>);

    impl Animatable for Values {
        fn read(&self, key: TweenKey) -> Option<TweenValue> {
            self.0.get(&key).copied()
        }

        fn write(&mut self, key: TweenKey, value: TweenValue) {
            self.0.insert(key, value);
        }
    }

    fn scalar(values: &Values, key: TweenKey) -> f32 {
        match values.read(key) {
            Some(TweenValue::Scalar(v)) => v,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn easing_endpoints() {
        for easing in [
            Easing::Linear,
            Easing::Power2Out,
            Easing::Power3InOut,
            Easing::Power4Out,
            Easing::Power4InOut,
            Easing::BackOut(2.0),
        ] {
            assert!(easing.apply(0.0).abs() < 1e-6, "{easing:?}");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-6, "{easing:?}");
        }
        assert!((Easing::Power4InOut.apply(0.5) - 0.5).abs() < 1e-6);
        assert!(Easing::BackOut(2.0).apply(0.6) > 1.0);
        assert_eq!(Easing::Linear.apply(2.0), 1.0);
    }

    #[test]
    fn completion_lands_exactly_on_target() {
        let key = TweenKey::camera(Channel::PositionY);
        let mut values = Values::default();
        let mut tweens = Tweener::new();
        tweens.start(
            key,
            TweenValue::Scalar(0.0),
            TweenValue::Scalar(3.0),
            1.0,
            Easing::Power4InOut,
            Some("done"),
        );

        assert!(tweens.advance(0.4, &mut values).is_empty());
        let mid = scalar(&values, key);
        assert!(mid > 0.0 && mid < 3.0);

        // Overshooting the duration still writes the exact end value.
        assert_eq!(tweens.advance(0.7, &mut values), vec!["done"]);
        assert_eq!(scalar(&values, key), 3.0);
        assert_eq!(tweens.active(), 0);
    }

    #[test]
    fn last_caller_wins() {
        let key = TweenKey::camera(Channel::PositionX);
        let mut values = Values::default();
        let mut tweens = Tweener::new();
        tweens.start(key, TweenValue::Scalar(0.0), TweenValue::Scalar(10.0), 1.0, Easing::Linear, Some(1));
        tweens.advance(0.5, &mut values);
        tweens.start(key, TweenValue::Scalar(5.0), TweenValue::Scalar(-1.0), 1.0, Easing::Linear, Some(2));
        assert_eq!(tweens.active(), 1);

        let done = tweens.advance(1.0, &mut values);
        assert_eq!(done, vec![2]);
        assert_eq!(scalar(&values, key), -1.0);
    }

    #[test]
    fn independent_channels_run_side_by_side() {
        let x = TweenKey::camera(Channel::PositionX);
        let look = TweenKey::camera(Channel::Look);
        let mut values = Values::default();
        let mut tweens: Tweener<()> = Tweener::new();
        tweens.start(x, TweenValue::Scalar(0.0), TweenValue::Scalar(1.0), 1.0, Easing::Linear, None);
        tweens.start(
            look,
            TweenValue::Vector(Vec3::ZERO),
            TweenValue::Vector(Vec3::X),
            2.0,
            Easing::Power4Out,
            None,
        );
        assert!(tweens.is_tweening(x) && tweens.is_tweening(look));

        tweens.advance(1.0, &mut values);
        assert!(!tweens.is_tweening(x));
        assert!(tweens.is_tweening(look));
        assert_eq!(tweens.kill_tweens_of(Target::Camera), 1);
        assert!(!tweens.kill(look));
    }

    #[test]
    fn zero_duration_completes_on_next_advance() {
        let key = TweenKey::camera(Channel::Scale);
        let mut values = Values::default();
        let mut tweens = Tweener::new();
        tweens.start(
            key,
            TweenValue::Vector(Vec3::ONE),
            TweenValue::Vector(Vec3::splat(2.0)),
            0.0,
            Easing::Linear,
            Some(()),
        );
        assert_eq!(tweens.advance(0.0, &mut values).len(), 1);
        assert_eq!(values.read(key), Some(TweenValue::Vector(Vec3::splat(2.0))));
    }
}
