//! Volume and mute state
//!
//! The stored level is a linear 0.0-1.0 value handed straight to the
//! platform audio element. Muting never touches the stored level, so a
//! volume slider keeps its position while muted.

use tracing::warn;

/// Volume controller
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    /// Volume level (0.0-1.0)
    level: f32,

    /// Mute state (preserves volume level)
    muted: bool,
}

impl Volume {
    /// Create new volume controller
    ///
    /// # Arguments
    /// * `level` - Initial volume, clamped to 0.0-1.0
    pub fn new(level: f32) -> Self {
        let mut volume = Self {
            level: 1.0,
            muted: false,
        };
        volume.set_level(level);
        volume
    }

    /// Set volume level, clamped to 0.0-1.0
    ///
    /// NaN is rejected and leaves the previous level in place.
    pub fn set_level(&mut self, level: f32) {
        if level.is_nan() {
            warn!("Ignoring NaN volume level, keeping {}", self.level);
            return;
        }
        self.level = level.clamp(0.0, 1.0);
    }

    /// Get stored volume level (0.0-1.0), regardless of mute
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Mute audio (preserves volume level)
    pub fn mute(&mut self) {
        self.muted = true;
    }

    /// Unmute audio
    pub fn unmute(&mut self) {
        self.muted = false;
    }

    /// Toggle mute state
    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
    }

    /// Check if muted
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Level the audio handle should actually output
    ///
    /// Returns 0.0 if muted, otherwise the stored level
    pub fn effective(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.level
        }
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_volume() {
        let vol = Volume::new(0.8);
        assert_eq!(vol.level(), 0.8);
        assert!(!vol.is_muted());
    }

    #[test]
    fn set_volume_level_clamps() {
        let mut vol = Volume::new(0.5);

        vol.set_level(0.75);
        assert_eq!(vol.level(), 0.75);

        vol.set_level(1.5);
        assert_eq!(vol.level(), 1.0);

        vol.set_level(-0.2);
        assert_eq!(vol.level(), 0.0);

        vol.set_level(f32::INFINITY);
        assert_eq!(vol.level(), 1.0);
    }

    #[test]
    fn nan_keeps_previous_level() {
        let mut vol = Volume::new(0.3);
        vol.set_level(f32::NAN);
        assert_eq!(vol.level(), 0.3);

        let vol = Volume::new(f32::NAN);
        assert_eq!(vol.level(), 1.0);
    }

    #[test]
    fn mute_unmute_preserves_level() {
        let mut vol = Volume::new(0.6);

        vol.mute();
        assert!(vol.is_muted());
        assert_eq!(vol.level(), 0.6);
        assert_eq!(vol.effective(), 0.0);

        vol.unmute();
        assert!(!vol.is_muted());
        assert_eq!(vol.effective(), 0.6);
    }

    #[test]
    fn toggle_mute() {
        let mut vol = Volume::default();

        vol.toggle_mute();
        assert!(vol.is_muted());

        vol.toggle_mute();
        assert!(!vol.is_muted());
    }

    #[test]
    fn set_level_while_muted_stays_silent() {
        let mut vol = Volume::new(0.4);
        vol.mute();
        vol.set_level(0.9);

        assert_eq!(vol.level(), 0.9);
        assert_eq!(vol.effective(), 0.0);
    }
}
