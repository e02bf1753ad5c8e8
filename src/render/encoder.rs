use crate::config::QualityProfile;

pub const VIDEO_CODEC: &str = "libx264";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateControl {
    /// Constant rate factor.
    Crf(u8),
    /// Average bitrate with a peak of 1.5x and a buffer of 2x, in kbit/s.
    Bitrate(u32),
}

/// Video encoder settings for one quality profile. Audio is always copied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncoderParams {
    pub preset: &'static str,
    pub rate: RateControl,
}

impl EncoderParams {
    pub fn for_profile(profile: QualityProfile) -> Self {
        match profile {
            QualityProfile::High => Self {
                preset: "superfast",
                rate: RateControl::Crf(23),
            },
            QualityProfile::Medium => Self {
                preset: "superfast",
                rate: RateControl::Crf(28),
            },
            QualityProfile::Low => Self {
                preset: "ultrafast",
                rate: RateControl::Crf(32),
            },
            QualityProfile::Custom { bitrate_kbps } => Self {
                preset: "superfast",
                rate: RateControl::Bitrate(bitrate_kbps),
            },
        }
    }

    pub fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-c:v".into(),
            VIDEO_CODEC.into(),
            "-preset".into(),
            self.preset.into(),
        ];

        match self.rate {
            RateControl::Crf(crf) => {
                args.extend(["-crf".to_string(), crf.to_string()]);
            }
            RateControl::Bitrate(kbps) => {
                let kbps = kbps as f64;
                args.extend([
                    "-b:v".to_string(),
                    format!("{}k", kbps),
                    "-maxrate".to_string(),
                    format!("{}k", kbps * 1.5),
                    "-bufsize".to_string(),
                    format!("{}k", kbps * 2.0),
                ]);
            }
        }

        args.extend(["-c:a".to_string(), "copy".to_string()]);
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(profile: QualityProfile) -> String {
        EncoderParams::for_profile(profile).to_args().join(" ")
    }

    #[test]
    fn test_quality_table() {
        assert_eq!(
            args(QualityProfile::High),
            "-c:v libx264 -preset superfast -crf 23 -c:a copy"
        );
        assert_eq!(
            args(QualityProfile::Medium),
            "-c:v libx264 -preset superfast -crf 28 -c:a copy"
        );
        assert_eq!(
            args(QualityProfile::Low),
            "-c:v libx264 -preset ultrafast -crf 32 -c:a copy"
        );
    }

    #[test]
    fn test_custom_bitrate() {
        assert_eq!(
            args(QualityProfile::Custom { bitrate_kbps: 2000 }),
            "-c:v libx264 -preset superfast -b:v 2000k -maxrate 3000k -bufsize 4000k -c:a copy"
        );
        assert_eq!(
            args(QualityProfile::Custom { bitrate_kbps: 1001 }),
            "-c:v libx264 -preset superfast -b:v 1001k -maxrate 1501.5k -bufsize 2002k -c:a copy"
        );
    }
}
