//! Grouping recognized fragments into reading-order lines.
//!
//! Fragments are sorted by vertical center and swept top to bottom. A new
//! line starts whenever a fragment's center is further than the threshold
//! from the current line's anchor. Members of each finished line are then
//! ordered left to right and joined with single spaces.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::geometry::{BoundingBox, Fragment};

/// Default vertical clustering distance, in pixels.
pub const DEFAULT_LINE_THRESHOLD: f32 = 30.0;

/// How a line's anchor moves as fragments join it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorPolicy {
    /// The first member's center anchors the band and never moves.
    #[default]
    FirstFragment,
    /// The anchor is the mean center of the members so far.
    RunningMean,
}

/// A finished line of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    #[serde(rename = "line_text")]
    text: String,
    bbox: BoundingBox,
    anchor_y: f32,
    fragments: Vec<Fragment>,
}

impl Line {
    /// Build a line from its members. `fragments` must be non-empty.
    fn from_fragments(mut fragments: Vec<Fragment>, anchor_y: f32) -> Option<Self> {
        fragments.sort_by(|a, b| a.bbox().x_min().total_cmp(&b.bbox().x_min()));

        let bbox = fragments
            .iter()
            .map(|f| *f.bbox())
            .reduce(|acc, b| acc.union(&b))?;

        let text = fragments
            .iter()
            .map(|f| f.text())
            .collect::<Vec<_>>()
            .join(" ");

        Some(Self {
            text,
            bbox,
            anchor_y,
            fragments,
        })
    }

    /// Member texts joined left to right with single spaces.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Union of the member boxes.
    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Vertical coordinate the line was clustered against.
    pub fn anchor_y(&self) -> f32 {
        self.anchor_y
    }

    /// Members in left-to-right order.
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }
}

/// Vertical-proximity line grouper.
#[derive(Debug, Clone)]
pub struct LineGrouper {
    threshold: f32,
    anchor_policy: AnchorPolicy,
}

impl LineGrouper {
    /// Create a grouper with the given threshold and first-fragment anchoring.
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            anchor_policy: AnchorPolicy::FirstFragment,
        }
    }

    /// Set the anchor policy.
    pub fn with_anchor_policy(mut self, policy: AnchorPolicy) -> Self {
        self.anchor_policy = policy;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn anchor_policy(&self) -> AnchorPolicy {
        self.anchor_policy
    }

    /// Group fragments into lines, top to bottom.
    ///
    /// Every input fragment ends up in exactly one line.
    pub fn group(&self, mut fragments: Vec<Fragment>) -> Vec<Line> {
        fragments.sort_by(|a, b| a.bbox().center_y().total_cmp(&b.bbox().center_y()));

        let mut lines = Vec::new();
        let mut current: Vec<Fragment> = Vec::new();
        let mut anchor: Option<f32> = None;

        for fragment in fragments {
            let y_center = fragment.bbox().center_y();

            match anchor {
                // A NaN threshold fails this test, so it splits instead of merging.
                Some(a) if (y_center - a).abs() <= self.threshold => {
                    current.push(fragment);
                    if self.anchor_policy == AnchorPolicy::RunningMean {
                        anchor = Some(mean_center(&current));
                    }
                }
                _ => {
                    if let Some(a) = anchor {
                        lines.extend(Line::from_fragments(std::mem::take(&mut current), a));
                    }
                    current.push(fragment);
                    anchor = Some(y_center);
                }
            }
        }

        if let Some(a) = anchor {
            lines.extend(Line::from_fragments(current, a));
        }

        debug!(
            "Grouped fragments into {} lines (threshold {}, {:?})",
            lines.len(),
            self.threshold,
            self.anchor_policy
        );

        lines
    }
}

impl Default for LineGrouper {
    fn default() -> Self {
        Self::new(DEFAULT_LINE_THRESHOLD)
    }
}

fn mean_center(fragments: &[Fragment]) -> f32 {
    let sum: f32 = fragments.iter().map(|f| f.bbox().center_y()).sum();
    sum / fragments.len() as f32
}

/// Group fragments with first-fragment anchoring.
pub fn group_into_lines(fragments: Vec<Fragment>, line_threshold: f32) -> Vec<Line> {
    LineGrouper::new(line_threshold).group(fragments)
}

/// Join line texts top to bottom with `\n`.
pub fn join_lines(lines: &[Line]) -> String {
    lines
        .iter()
        .map(|line| line.text())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn frag(x_min: f32, y_min: f32, x_max: f32, y_max: f32, text: &str) -> Fragment {
        Fragment::new(BoundingBox::new(x_min, y_min, x_max, y_max).unwrap(), text)
    }

    fn texts(lines: &[Line]) -> Vec<&str> {
        lines.iter().map(|l| l.text()).collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(group_into_lines(Vec::new(), 30.0).is_empty());
        assert_eq!(join_lines(&[]), "");
    }

    #[test]
    fn test_single_fragment() {
        let lines = group_into_lines(vec![frag(0.0, 0.0, 10.0, 10.0, "hello")], 30.0);
        assert_eq!(texts(&lines), vec!["hello"]);
        assert_eq!(lines[0].bbox().to_array(), [0.0, 0.0, 10.0, 10.0]);
    }

    #[test]
    fn test_unordered_receipt_rows() {
        let fragments = vec![
            frag(200.0, 102.0, 300.0, 122.0, "50.000"),
            frag(10.0, 10.0, 120.0, 30.0, "CỬA HÀNG"),
            frag(10.0, 100.0, 150.0, 120.0, "Tổng cộng:"),
            frag(130.0, 12.0, 220.0, 32.0, "TIỆN LỢI"),
        ];

        let lines = group_into_lines(fragments, 30.0);

        assert_eq!(texts(&lines), vec!["CỬA HÀNG TIỆN LỢI", "Tổng cộng: 50.000"]);
        assert_eq!(lines[0].bbox().to_array(), [10.0, 10.0, 220.0, 32.0]);
        assert_eq!(lines[1].bbox().to_array(), [10.0, 100.0, 300.0, 122.0]);
        assert_eq!(
            join_lines(&lines),
            "CỬA HÀNG TIỆN LỢI\nTổng cộng: 50.000"
        );
    }

    #[test]
    fn test_fragments_ordered_left_to_right() {
        let fragments = vec![
            frag(300.0, 0.0, 400.0, 20.0, "c"),
            frag(0.0, 4.0, 100.0, 24.0, "a"),
            frag(150.0, 2.0, 250.0, 22.0, "b"),
        ];

        let lines = group_into_lines(fragments, 30.0);

        assert_eq!(lines.len(), 1);
        let xs: Vec<f32> = lines[0].fragments().iter().map(|f| f.bbox().x_min()).collect();
        assert_eq!(xs, vec![0.0, 150.0, 300.0]);
        assert_eq!(lines[0].text(), "a b c");
    }

    #[test]
    fn test_fragment_count_preserved() {
        let fragments: Vec<Fragment> = (0..25)
            .map(|i| {
                let y = (i * 17 % 200) as f32;
                let x = (i * 37 % 300) as f32;
                frag(x, y, x + 20.0, y + 10.0, &i.to_string())
            })
            .collect();

        let lines = group_into_lines(fragments, 12.0);
        let total: usize = lines.iter().map(|l| l.fragments().len()).sum();
        assert_eq!(total, 25);
    }

    #[test]
    fn test_members_within_threshold_of_anchor() {
        let fragments: Vec<Fragment> = (0..20)
            .map(|i| {
                let y = (i * 7) as f32;
                frag(0.0, y, 10.0, y + 8.0, "x")
            })
            .collect();

        let threshold = 15.0;
        for line in group_into_lines(fragments, threshold) {
            for f in line.fragments() {
                assert!((f.bbox().center_y() - line.anchor_y()).abs() <= threshold);
            }
        }
    }

    #[test]
    fn test_identical_centers_share_line_at_zero_threshold() {
        let fragments = vec![
            frag(50.0, 10.0, 90.0, 30.0, "right"),
            frag(0.0, 10.0, 40.0, 30.0, "left"),
        ];

        let lines = group_into_lines(fragments, 0.0);
        assert_eq!(texts(&lines), vec!["left right"]);
    }

    #[test]
    fn test_negative_threshold_splits_everything() {
        let fragments = vec![
            frag(0.0, 0.0, 10.0, 10.0, "a"),
            frag(20.0, 1.0, 30.0, 11.0, "b"),
        ];

        let lines = group_into_lines(fragments, -5.0);
        assert_eq!(texts(&lines), vec!["a", "b"]);
    }

    #[test]
    fn test_nan_threshold_does_not_panic() {
        let fragments = vec![
            frag(0.0, 0.0, 10.0, 10.0, "a"),
            frag(20.0, 1.0, 30.0, 11.0, "b"),
        ];

        let lines = group_into_lines(fragments, f32::NAN);
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_running_mean_follows_skewed_row() {
        // A slightly tilted row: each word sits 8px lower than the last.
        let fragments: Vec<Fragment> = (0..5)
            .map(|i| {
                let y = (i * 8) as f32;
                let x = (i * 100) as f32;
                frag(x, y, x + 90.0, y + 20.0, &format!("w{}", i))
            })
            .collect();

        let first = LineGrouper::new(20.0).group(fragments.clone());
        assert_eq!(texts(&first), vec!["w0 w1 w2", "w3 w4"]);

        let running = LineGrouper::new(20.0)
            .with_anchor_policy(AnchorPolicy::RunningMean)
            .group(fragments);
        assert_eq!(texts(&running), vec!["w0 w1 w2 w3 w4"]);
    }

    #[test]
    fn test_line_serializes_with_line_text() {
        let lines = group_into_lines(vec![frag(1.0, 2.0, 3.0, 4.0, "SĐT")], 30.0);
        let json = serde_json::to_value(&lines[0]).unwrap();
        assert_eq!(json["line_text"], "SĐT");
        assert_eq!(json["bbox"], serde_json::json!([1.0, 2.0, 3.0, 4.0]));
    }
}
