//! Property tests for converter argument building and tag parsing

use camino::Utf8PathBuf;
use proptest::prelude::*;
use slp2mp4_gui::models::{ConversionRequest, Privacy, YoutubeOptions, parse_tags};
use slp2mp4_gui::services::ConversionService;

fn privacy_strategy() -> impl Strategy<Value = Privacy> {
    prop::sample::select(Privacy::ALL.to_vec())
}

fn youtube_strategy() -> impl Strategy<Value = YoutubeOptions> {
    (
        any::<bool>(),
        ".*",
        ".*",
        prop::collection::vec("[a-z0-9 ]{1,8}", 0..5),
        privacy_strategy(),
    )
        .prop_map(|(enabled, title_template, description, tags, privacy)| YoutubeOptions {
            enabled,
            title_template,
            description,
            tags,
            privacy,
        })
}

proptest! {
    #[test]
    fn parsed_tags_are_trimmed(raw in ".*") {
        let tags = parse_tags(&raw);
        prop_assert_eq!(tags.len(), raw.matches(',').count() + 1);
        for tag in tags {
            prop_assert_eq!(tag.trim(), tag.as_str());
            prop_assert!(!tag.contains(','));
        }
    }

    #[test]
    fn parse_tags_is_idempotent_on_joined_output(raw in ".*") {
        let tags = parse_tags(&raw);
        prop_assert_eq!(parse_tags(&tags.join(",")), tags);
    }

    #[test]
    fn base_arguments_always_lead(
        input in "[a-zA-Z0-9/_ .-]{1,40}",
        output in "[a-zA-Z0-9/_ .-]{1,40}",
        youtube in prop::option::of(youtube_strategy()),
    ) {
        let request = ConversionRequest {
            input_directory: Utf8PathBuf::from(input.clone()),
            output_directory: Utf8PathBuf::from(output.clone()),
            youtube,
        };

        let args = ConversionService::build_args(&request);
        prop_assert!(args.len() >= 4);
        prop_assert_eq!(&args[..4], &["run".to_string(), "-o".to_string(), output, input][..]);
    }

    #[test]
    fn youtube_flags_only_when_enabled(youtube in youtube_strategy()) {
        let enabled = youtube.enabled;
        let request = ConversionRequest {
            input_directory: Utf8PathBuf::from("/replays"),
            output_directory: Utf8PathBuf::from("/videos"),
            youtube: Some(youtube),
        };

        let args = ConversionService::build_args(&request);
        if enabled {
            prop_assert_eq!(args.len(), 13);
            prop_assert_eq!(args[4].as_str(), "--youtube");
        } else {
            prop_assert_eq!(args.len(), 4);
        }
    }
}
