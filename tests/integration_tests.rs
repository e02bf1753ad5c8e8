//! Integration tests for subforge
//!
//! These tests drive the public API end to end without requiring FFmpeg.
//! Tests that do need it skip themselves when it is not installed.

use subforge::config::{Config, DisplayMode, QualityProfile, ResolutionMode, SubtitleFormat};
use subforge::render::{
    compile_filter_graph, cue_ranges, ErasureRegion, ErasureSettings, FilterGraphRequest,
    SubtitleInput, VideoFilter,
};
use subforge::subtitle::{
    ass, create_formatter, insert_after, merge_adjacent, parse_subtitles, read_subtitle_file,
    split_at, swap_tracks, timecode, validate_cues, Cue, CueStyle, FormatOptions, MergeDirection,
    TextField,
};
use subforge::{export_subtitles, Session, SubforgeError};

fn sample_cues() -> Vec<Cue> {
    vec![
        Cue::new(1.5, 4.0, "Hello, welcome to this video."),
        Cue::new(4.5, 7.0, "Today we're going to learn."),
    ]
}

fn ffmpeg_available() -> bool {
    subforge::engine::check_ffmpeg("ffmpeg").is_ok()
}

// ============================================================================
// Config Integration Tests
// ============================================================================

mod config_tests {
    use super::*;

    #[test]
    fn test_config_default_values() {
        let config = Config::default();
        assert_eq!(config.default_format, SubtitleFormat::Srt);
        assert_eq!(config.default_resolution, ResolutionMode::Original);
        assert_eq!(config.display_mode, DisplayMode::Main);
        assert_eq!(config.subtitle_language, "und");
    }

    #[test]
    fn test_config_fonts_dir_validation() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config {
            fonts_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        config.fonts_dir = Some(dir.path().join("missing"));
        assert!(matches!(config.validate(), Err(SubforgeError::Config(_))));
    }

    #[test]
    fn test_subtitle_format_extensions() {
        assert_eq!(SubtitleFormat::Srt.extension(), "srt");
        assert_eq!(SubtitleFormat::Vtt.extension(), "vtt");
        assert_eq!(SubtitleFormat::Ass.extension(), "ass");
        assert_eq!(SubtitleFormat::Json.extension(), "json");
    }
}

// ============================================================================
// Time Code Tests
// ============================================================================

mod timecode_tests {
    use super::*;

    #[test]
    fn test_format_and_parse_agree() {
        assert_eq!(timecode::seconds_to_timecode(3725.5), "01:02:05.500");
        assert_eq!(timecode::timecode_to_seconds("01:02:05.500"), 3725.5);
        assert_eq!(timecode::timecode_to_seconds("00:00:01,250"), 1.25);
        assert_eq!(timecode::timecode_to_seconds("1:02:05.500"), 3725.5);
    }

    #[test]
    fn test_malformed_input_is_zero() {
        assert_eq!(timecode::timecode_to_seconds("garbage"), 0.0);
        assert!(timecode::parse_timecode("garbage").is_err());
    }

    #[test]
    fn test_negative_seconds_clamp() {
        assert_eq!(timecode::seconds_to_timecode(-4.0), "00:00:00.000");
    }

    #[test]
    fn test_oversized_seconds_clamp_to_zero() {
        assert_eq!(timecode::timecode_to_seconds("99999999999999999"), 0.0);
        assert!(timecode::parse_timecode("99999999999999999").is_err());
    }

    #[test]
    fn test_oversized_hours_in_file_are_rejected() {
        let content = "1\n99999999999999999:00:00,000 --> 99999999999999999:00:01,000\nhuge\n";
        let result = parse_subtitles(content, SubtitleFormat::Srt);
        assert!(matches!(result, Err(SubforgeError::Validation(_))));
    }
}

// ============================================================================
// Subtitle Formatter Integration Tests
// ============================================================================

mod subtitle_formatter_tests {
    use super::*;

    #[test]
    fn test_srt_formatter_integration() {
        let formatter = create_formatter(SubtitleFormat::Srt, &FormatOptions::default());
        let output = formatter.format(&sample_cues());

        assert!(output.starts_with("1\n00:00:01,500 --> 00:00:04,000\n"));
        assert!(output.contains("2\n00:00:04,500 --> 00:00:07,000\nToday we're going to learn."));
        assert_eq!(formatter.extension(), "srt");
    }

    #[test]
    fn test_vtt_formatter_integration() {
        let formatter = create_formatter(SubtitleFormat::Vtt, &FormatOptions::default());
        let output = formatter.format(&sample_cues());

        assert!(output.starts_with("WEBVTT\n\n"));
        assert!(output.contains("00:00:01.500 --> 00:00:04.000"));
    }

    #[test]
    fn test_json_formatter_integration() {
        let formatter = create_formatter(SubtitleFormat::Json, &FormatOptions::default());
        let output = formatter.format(&sample_cues());

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["metadata"]["subtitle_count"], 2);
        assert_eq!(value["subtitles"][0]["startTime"], 1.5);
        assert_eq!(value["subtitles"][1]["text"], "Today we're going to learn.");
    }

    #[test]
    fn test_dual_mode_plain_text() {
        let cues = vec![Cue::new(0.0, 1.0, "main").with_text2(Some("second".to_string()))];
        let options = FormatOptions {
            mode: DisplayMode::Dual,
            ..Default::default()
        };
        let output = create_formatter(SubtitleFormat::Srt, &options).format(&cues);
        assert!(output.contains("second\nmain"));
    }

    #[test]
    fn test_conversion_through_every_format() {
        let cues = sample_cues();
        for format in [
            SubtitleFormat::Srt,
            SubtitleFormat::Vtt,
            SubtitleFormat::Ass,
            SubtitleFormat::Json,
        ] {
            let text = create_formatter(format, &FormatOptions::default()).format(&cues);
            let back = parse_subtitles(&text, format).unwrap();
            assert_eq!(back.len(), 2, "{format}");
            assert_eq!(back[0].text(), cues[0].text(), "{format}");
            assert!((back[1].start_time() - 4.5).abs() < 0.011, "{format}");
        }
    }
}

// ============================================================================
// ASS Markup Compiler Tests
// ============================================================================

mod markup_tests {
    use super::*;

    #[test]
    fn test_header_and_events() {
        let markup = ass::compile_markup(&sample_cues(), &FormatOptions::default());

        assert!(markup.contains("PlayResX: 1920"));
        assert!(markup.contains("PlayResY: 1080"));
        assert!(markup.contains("Style: Default,Noto Sans CJK SC,30,"));
        assert!(markup.contains("Dialogue: 0,0:00:01.50,0:00:04.00,Default,,0,0,0,,"));
    }

    #[test]
    fn test_per_cue_overrides() {
        let style = CueStyle {
            color: Some("#ff0000".to_string()),
            x: Some(100.0),
            y: Some(200.0),
            ..Default::default()
        };
        let cues = vec![Cue::new(0.0, 1.0, "styled").with_style(style)];
        let markup = ass::compile_markup(&cues, &FormatOptions::default());

        assert!(markup.contains(",,{\\pos(100,200)\\c&H0000FF&}styled"));
    }

    #[test]
    fn test_dual_mode_stacks_secondary_above() {
        let cues = vec![Cue::new(0.0, 1.0, "main").with_text2(Some("second".to_string()))];
        let options = FormatOptions {
            mode: DisplayMode::Dual,
            ..Default::default()
        };
        let markup = ass::compile_markup(&cues, &options);
        let event = markup
            .lines()
            .find(|line| line.starts_with("Dialogue:"))
            .unwrap();

        let second = event.find("second").unwrap();
        let main = event.rfind("main").unwrap();
        assert!(second < main);
        assert!(event.contains("{\\fs24}second"));
        assert!(event.contains("{\\fs30\\1a&H00&}main"));
    }
}

// ============================================================================
// Edit Algebra Tests
// ============================================================================

mod edit_tests {
    use super::*;

    #[test]
    fn test_session_edit_and_undo() {
        let mut session = Session::new().with_cues(sample_cues());

        session.apply(|list| split_at(list, 0, TextField::Text, 6));
        assert_eq!(session.cues().len(), 3);
        assert_eq!(session.cues()[0].text(), "Hello,");
        assert_eq!(session.cues()[0].end_time(), 2.75);

        session.apply(|list| merge_adjacent(list, 0, MergeDirection::Next));
        assert_eq!(session.cues().len(), 2);
        let merged: Vec<&str> = session.cues()[0].text().split_whitespace().collect();
        assert_eq!(merged.join(" "), "Hello, welcome to this video.");
        assert_eq!(session.cues()[0].end_time(), 4.0);

        assert!(session.undo());
        assert!(session.undo());
        assert_eq!(session.cues(), sample_cues().as_slice());
    }

    #[test]
    fn test_insert_fills_gap() {
        let list = insert_after(&sample_cues(), 0);
        assert_eq!(list.len(), 3);
        assert_eq!(list[1].start_time(), 4.0);
        assert_eq!(list[1].end_time(), 4.5);
        assert_eq!(list[1].text(), "");
    }

    #[test]
    fn test_insert_after_max_index_is_noop() {
        let list = sample_cues();
        assert_eq!(insert_after(&list, usize::MAX), list);
    }

    #[test]
    fn test_blank_cue_survives_json_round_trip() {
        let list = insert_after(&sample_cues(), 0);
        let text = create_formatter(SubtitleFormat::Json, &FormatOptions::default()).format(&list);
        let back = parse_subtitles(&text, SubtitleFormat::Json).unwrap();
        assert_eq!(back, list);
    }

    #[test]
    fn test_swap_tracks_twice_restores_text() {
        let cues = vec![Cue::new(0.0, 1.0, "a").with_text2(Some("b".to_string()))];
        let twice = swap_tracks(&swap_tracks(&cues));
        assert_eq!(twice, cues);
    }

    #[test]
    fn test_secondary_alignment_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("second.srt");
        std::fs::write(
            &path,
            "1\n00:00:01,000 --> 00:00:03,000\nBonjour\n\n2\n00:00:05,000 --> 00:00:06,000\nAujourd'hui\n",
        )
        .unwrap();

        let mut session = Session::new().with_cues(sample_cues());
        session.import_secondary(read_subtitle_file(&path).unwrap());

        assert_eq!(session.cues()[0].text2(), Some("Bonjour"));
        assert_eq!(session.cues()[1].text2(), Some("Aujourd'hui"));
    }
}

// ============================================================================
// Filter Graph Tests
// ============================================================================

mod filter_graph_tests {
    use super::*;

    fn subtitles() -> Option<SubtitleInput> {
        Some(SubtitleInput::new("subtitle.ass", "fonts"))
    }

    #[test]
    fn test_smart_blur_burn_and_scale() {
        let cues = vec![
            Cue::new(1.0, 2.0, "a"),
            Cue::new(2.05, 3.0, "b"),
            Cue::new(5.0, 6.0, "c"),
        ];
        let plan = compile_filter_graph(&FilterGraphRequest {
            erasure: Some(ErasureSettings::new(
                ErasureRegion::new(10.0, 20.0, 300.0, 40.0),
                50.0,
            )),
            smart_ranges: Some(cue_ranges(&cues)),
            subtitles: subtitles(),
            resolution: ResolutionMode::P720,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(
            plan.graph_expression(),
            Some(
                "[0:v]split[main][to_blur];[to_blur]crop=300:40:10:20,boxblur=20:2[blurred];\
                 [main][blurred]overlay=10:20:enable='between(t,1,3)+between(t,5,6)'[v_erased];\
                 [v_erased]subtitles=subtitle.ass:fontsdir=fonts[outv];\
                 [outv]scale=-2:720[scaled]"
            )
        );
        assert_eq!(plan.output_mapping(), vec!["[scaled]", "0:a?"]);
    }

    #[test]
    fn test_soft_embed_never_burns() {
        let plan = compile_filter_graph(&FilterGraphRequest {
            subtitles: Some(SubtitleInput::new("subtitle.srt", "fonts")),
            soft_embed: true,
            subtitle_language: "eng".to_string(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(plan.video_filter, VideoFilter::None);
        let args = plan.encode_args("in.mp4", "out.mp4").join(" ");
        assert!(args.starts_with("-i in.mp4 -i subtitle.srt"));
        assert!(args.contains("-map 0:v -map 0:a? -map 1:0"));
        assert!(args.contains("-c:s mov_text"));
        assert!(args.contains("language=eng"));
        assert!(!args.contains("subtitles="));
    }

    #[test]
    fn test_custom_bitrate_args() {
        let plan = compile_filter_graph(&FilterGraphRequest {
            quality: QualityProfile::Custom { bitrate_kbps: 2000 },
            ..Default::default()
        })
        .unwrap();
        let args = plan.encode_args("in.mp4", "out.mp4").join(" ");
        assert!(args.contains("-b:v 2000k -maxrate 3000k -bufsize 4000k"));
    }
}

// ============================================================================
// Export Tests
// ============================================================================

mod export_tests {
    use super::*;

    #[test]
    fn test_export_subtitles_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.vtt");

        export_subtitles(
            &sample_cues(),
            SubtitleFormat::Vtt,
            &FormatOptions::default(),
            &output,
        )
        .unwrap();

        let back = read_subtitle_file(&output).unwrap();
        assert_eq!(back.len(), 2);
    }

    #[test]
    fn test_illegal_cue_blocks_export() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.srt");
        let cues = vec![Cue::new(3.0, 1.0, "backwards")];

        assert!(validate_cues(&cues).is_err());
        let result = export_subtitles(&cues, SubtitleFormat::Srt, &FormatOptions::default(), &output);
        assert!(matches!(result, Err(SubforgeError::Validation(_))));
        assert!(!output.exists());
    }

    #[test]
    fn test_missing_input_file() {
        let result = read_subtitle_file(std::path::Path::new("/nonexistent/subs.srt"));
        assert!(matches!(result, Err(SubforgeError::MissingResource(_))));
    }

    #[test]
    fn test_ffmpeg_version_check() {
        if !ffmpeg_available() {
            eprintln!("Skipping: ffmpeg not installed");
            return;
        }
        assert!(subforge::engine::check_ffmpeg("ffmpeg").is_ok());
        assert!(subforge::engine::check_ffmpeg("/nonexistent/ffmpeg").is_err());
    }
}
