// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! Subtitle timing heuristics and the line count/length sweep.
//!
//! Timing is checked against the XML as it appears in the package rather
//! than the parsed model, so that nothing this library's parser cleans up
//! can mask a problem in the file. The concurrency check is an event
//! sweep: each subtitle contributes an `in` event and a paired `out`
//! event, events are sorted by time, and the running state is a map from
//! vertical position to character count.

use std::collections::BTreeMap;

use crate::asset::subtitle::{Subtitle, SubtitleAsset, VAlign};
use crate::types::Time;
use crate::xml::{Document, Element};

/// Outcome of the timing scan over one text track.
#[derive(Debug, Default, Clone, Copy)]
pub(super) struct TextTimingResult {
    /// A subtitle appears within four seconds of the start of the DCP.
    pub too_early: bool,
    /// A subtitle lasts less than 15 frames.
    pub too_short: bool,
    /// A pair of consecutive subtitles is separated by less than 2 frames.
    pub too_close: bool,
}

/// Scan the subtitle XML of consecutive reels. `tracks` supplies, per reel,
/// the raw XML and the reel's played duration in editable units.
pub(super) fn check_text_timing(
    tracks: &[(String, i64)],
    picture_frame_rate: Option<i64>,
    result: &mut TextTimingResult,
) {
    let pfr = picture_frame_rate.unwrap_or(24);
    // End of the previous subtitle, in editable units from the DCP start.
    let mut last_out: Option<i64> = None;
    let mut reel_offset: i64 = 0;

    for (index, (xml, duration)) in tracks.iter().enumerate() {
        if let Ok(document) = Document::parse_str(xml) {
            let tcr = document
                .root
                .optional_string_child("TimeCodeRate")
                .and_then(|t| t.trim().parse().ok())
                .unwrap_or(24);
            scan_subtitles(
                &document.root,
                tcr,
                pfr,
                index == 0,
                reel_offset,
                &mut last_out,
                result,
            );
        }
        reel_offset += duration;
    }
}

fn scan_subtitles(
    node: &Element,
    tcr: i64,
    pfr: i64,
    first_reel: bool,
    reel_offset: i64,
    last_out: &mut Option<i64>,
    result: &mut TextTimingResult,
) {
    for child in node.elements() {
        if child.name() == "Subtitle" {
            let in_time = match child.attribute("TimeIn").and_then(|t| Time::parse(t, tcr).ok()) {
                Some(t) => t,
                None => continue,
            };
            let out_time = match child.attribute("TimeOut").and_then(|t| Time::parse(t, tcr).ok()) {
                Some(t) => t,
                None => continue,
            };

            if first_reel && in_time < Time::new(0, 0, 4, 0, tcr) {
                result.too_early = true;
            }
            let length = out_time.as_editable_units(pfr) - in_time.as_editable_units(pfr);
            if length < 15 {
                result.too_short = true;
            }
            if let Some(last) = *last_out {
                let distance = reel_offset + in_time.as_editable_units(pfr) - last;
                // Overlapping subtitles are tolerated; only a positive gap
                // that is too small is reported.
                if (0..2).contains(&distance) {
                    result.too_close = true;
                }
            }
            *last_out = Some(reel_offset + out_time.as_editable_units(pfr));
        } else {
            scan_subtitles(child, tcr, pfr, first_reel, reel_offset, last_out, result);
        }
    }
}

/// Outcome of the line count/length sweep.
#[derive(Debug, Default, Clone, Copy)]
pub(super) struct LinesCharactersResult {
    pub warning_length_exceeded: bool,
    pub error_length_exceeded: bool,
    pub line_count_exceeded: bool,
}

#[derive(Clone)]
struct Event {
    time: Time,
    /// Position from 0 at the top of the screen to 100 at the bottom.
    position: i64,
    characters: i64,
    /// `false` marks the start of a subtitle, `true` the end.
    ending: bool,
}

fn screen_position(v_align: VAlign, v_position: f32) -> i64 {
    let fraction = match v_align {
        VAlign::Top => v_position,
        VAlign::Center => 0.5 + v_position,
        VAlign::Bottom => 1.0 - v_position,
    };
    (fraction * 100.0).round() as i64
}

/// Sweep the text events of one subtitle asset, updating `result` with any
/// limits exceeded. `warning_length`/`error_length` are the per-line
/// character limits.
pub(super) fn check_text_lines_and_characters(
    asset: &SubtitleAsset,
    warning_length: i64,
    error_length: i64,
    result: &mut LinesCharactersResult,
) {
    let mut events: Vec<Event> = Vec::new();
    for subtitle in asset.subtitles() {
        if let Subtitle::Text(text) = subtitle {
            let position = screen_position(text.v_align, text.v_position);
            let characters = text.text.chars().count() as i64;
            events.push(Event {
                time: text.timing.in_time,
                position,
                characters,
                ending: false,
            });
            events.push(Event {
                time: text.timing.out_time,
                position,
                characters,
                ending: true,
            });
        }
    }

    events.sort_by(|a, b| {
        a.time
            .partial_cmp(&b.time)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Live lines: vertical position to character count.
    let mut current: BTreeMap<i64, i64> = BTreeMap::new();
    for event in &events {
        if current.len() > 3 {
            result.line_count_exceeded = true;
        }
        for characters in current.values() {
            if *characters >= warning_length {
                result.warning_length_exceeded = true;
            }
            if *characters >= error_length {
                result.error_length_exceeded = true;
            }
        }

        if event.ending {
            if let Some(count) = current.get_mut(&event.position) {
                if *count == event.characters {
                    current.remove(&event.position);
                } else {
                    *count -= event.characters;
                }
            }
        } else {
            *current.entry(event.position).or_insert(0) += event.characters;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::subtitle::{FontStyle, HAlign, SubtitleText, SubtitleTiming};

    fn track(subtitles: &[(&str, &str)]) -> String {
        let mut body = String::from(
            "<SubtitleReel xmlns=\"http://www.smpte-ra.org/schemas/428-7/2010/DCST\">\
             <TimeCodeRate>24</TimeCodeRate><SubtitleList><Font>",
        );
        for (time_in, time_out) in subtitles {
            body.push_str(&format!(
                "<Subtitle TimeIn=\"{}\" TimeOut=\"{}\"><Text Valign=\"bottom\" Vposition=\"10\">Hi</Text></Subtitle>",
                time_in, time_out
            ));
        }
        body.push_str("</Font></SubtitleList></SubtitleReel>");
        body
    }

    fn scan(subtitles: &[(&str, &str)]) -> TextTimingResult {
        let mut result = TextTimingResult::default();
        check_text_timing(&[(track(subtitles), 1440)], Some(24), &mut result);
        result
    }

    #[test]
    fn early_first_subtitle_is_flagged() {
        assert!(scan(&[("00:00:01:00", "00:00:03:00")]).too_early);
        assert!(!scan(&[("00:00:04:00", "00:00:06:00")]).too_early);
    }

    #[test]
    fn fifteen_frame_subtitle_is_acceptable() {
        // Exactly 15 frames at 24fps.
        assert!(!scan(&[("00:00:05:00", "00:00:05:15")]).too_short);
        // 14 frames is too short.
        assert!(scan(&[("00:00:05:00", "00:00:05:14")]).too_short);
    }

    #[test]
    fn two_frame_gap_is_acceptable() {
        assert!(!scan(&[("00:00:05:00", "00:00:06:00"), ("00:00:06:02", "00:00:07:02")]).too_close);
        assert!(scan(&[("00:00:05:00", "00:00:06:00"), ("00:00:06:01", "00:00:07:01")]).too_close);
        // Overlaps are permitted.
        assert!(!scan(&[("00:00:05:00", "00:00:06:00"), ("00:00:05:10", "00:00:07:00")]).too_close);
    }

    fn text_event(start_s: i64, end_s: i64, v_position: f32, body: &str) -> Subtitle {
        Subtitle::Text(SubtitleText {
            text: body.to_string(),
            font: FontStyle::default(),
            timing: SubtitleTiming {
                in_time: Time::new(0, 0, start_s, 0, 24),
                out_time: Time::new(0, 0, end_s, 0, 24),
                fade_up: Time::new(0, 0, 0, 0, 24),
                fade_down: Time::new(0, 0, 0, 0, 24),
            },
            h_align: HAlign::Center,
            h_position: 0.0,
            v_align: VAlign::Bottom,
            v_position,
        })
    }

    #[test]
    fn long_lines_are_flagged_at_the_right_thresholds() {
        let mut asset = SubtitleAsset::new_smpte("Test");
        asset.add(text_event(1, 5, 0.1, &"a".repeat(60)));
        let mut result = LinesCharactersResult::default();
        check_text_lines_and_characters(&asset, 52, 79, &mut result);
        assert!(result.warning_length_exceeded);
        assert!(!result.error_length_exceeded);

        let mut asset = SubtitleAsset::new_smpte("Test");
        asset.add(text_event(1, 5, 0.1, &"a".repeat(85)));
        let mut result = LinesCharactersResult::default();
        check_text_lines_and_characters(&asset, 52, 79, &mut result);
        assert!(result.error_length_exceeded);
    }

    #[test]
    fn more_than_three_concurrent_lines_are_flagged() {
        let mut asset = SubtitleAsset::new_smpte("Test");
        for i in 0..4 {
            asset.add(text_event(1, 5, 0.1 + 0.1 * i as f32, "line"));
        }
        let mut result = LinesCharactersResult::default();
        check_text_lines_and_characters(&asset, 52, 79, &mut result);
        assert!(result.line_count_exceeded);

        let mut asset = SubtitleAsset::new_smpte("Test");
        for i in 0..3 {
            asset.add(text_event(1, 5, 0.1 + 0.1 * i as f32, "line"));
        }
        let mut result = LinesCharactersResult::default();
        check_text_lines_and_characters(&asset, 52, 79, &mut result);
        assert!(!result.line_count_exceeded);
    }
}
