//! Skeleton and angle overlay.
//!
//! Drawing order is fixed: landmark markers first, then skeleton lines, then
//! angle labels, so identical inputs always produce identical pixels.

use crate::frame::Frame;
use crate::geometry::JointAngleSet;
use crate::landmark::{Landmark, LandmarkSet};
use embedded_graphics::{
    mono_font::{iso_8859_1::FONT_10X20, MonoTextStyle},
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{Circle, Line, PrimitiveStyle},
    text::{Baseline, Text},
};
use std::convert::Infallible;

/// Bones drawn between landmarks.
pub const SKELETON_CONNECTIONS: [(Landmark, Landmark); 8] = [
    (Landmark::LeftShoulder, Landmark::LeftElbow),
    (Landmark::LeftElbow, Landmark::LeftWrist),
    (Landmark::RightShoulder, Landmark::RightElbow),
    (Landmark::RightElbow, Landmark::RightWrist),
    (Landmark::LeftHip, Landmark::LeftKnee),
    (Landmark::LeftKnee, Landmark::LeftAnkle),
    (Landmark::RightHip, Landmark::RightKnee),
    (Landmark::RightKnee, Landmark::RightAnkle),
];

pub const MARKER_COLOR: Rgb888 = Rgb888::new(255, 0, 0);
pub const BONE_COLOR: Rgb888 = Rgb888::new(255, 255, 255);
pub const LABEL_COLOR: Rgb888 = Rgb888::new(255, 255, 0);

/// Radius of the filled landmark marker, in pixels.
pub const MARKER_RADIUS: u32 = 6;
pub const BONE_WIDTH: u32 = 2;
/// Label position relative to the joint, in pixels.
pub const LABEL_OFFSET: (i32, i32) = (10, -10);

/// Text shown next to a joint.
pub fn angle_label(degrees: f64) -> String {
    if degrees == 0.0 {
        "N/A".to_string()
    } else {
        format!("{}°", degrees as i64)
    }
}

/// Draw markers, bones and angle labels onto `frame` in place.
pub fn annotate(frame: &mut Frame, landmarks: &LandmarkSet, angles: &JointAngleSet) {
    let (width, height) = (frame.width(), frame.height());
    let mut keypoints: [Option<Point>; Landmark::COUNT] = [None; Landmark::COUNT];
    for (landmark, point) in landmarks.iter() {
        let (x, y) = point.to_pixel(width, height);
        keypoints[landmark.index()] = Some(Point::new(x, y));
    }

    let marker_style = PrimitiveStyle::with_fill(MARKER_COLOR);
    for center in keypoints.iter().flatten() {
        draw(
            Circle::with_center(*center, MARKER_RADIUS * 2 + 1).into_styled(marker_style),
            frame,
        );
    }

    let bone_style = PrimitiveStyle::with_stroke(BONE_COLOR, BONE_WIDTH);
    for (from, to) in SKELETON_CONNECTIONS {
        if let (Some(start), Some(end)) = (keypoints[from.index()], keypoints[to.index()]) {
            draw(Line::new(start, end).into_styled(bone_style), frame);
        }
    }

    let text_style = MonoTextStyle::new(&FONT_10X20, LABEL_COLOR);
    for (joint, degrees) in angles.iter() {
        let Some(anchor) = keypoints[joint.landmark().index()] else {
            continue;
        };
        let label = angle_label(degrees);
        let origin = anchor + Point::new(LABEL_OFFSET.0, LABEL_OFFSET.1);
        draw(
            Text::with_baseline(&label, origin, text_style, Baseline::Alphabetic),
            frame,
        );
    }
}

fn draw<D>(drawable: D, frame: &mut Frame)
where
    D: Drawable<Color = Rgb888>,
{
    match drawable.draw(frame) {
        Ok(_) => {}
        Err(infallible) => match infallible {},
    }
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }
}

impl DrawTarget for Frame {
    type Color = Rgb888;

    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0 && point.y >= 0 {
                self.set_pixel(
                    point.x as u32,
                    point.y as u32,
                    [color.r(), color.g(), color.b()],
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::compute_angles;
    use crate::landmark::LandmarkPoint;

    const BLACK: [u8; 3] = [0, 0, 0];

    fn pose() -> LandmarkSet {
        LandmarkSet::new()
            .with(Landmark::Nose, LandmarkPoint::new(0.5, 0.1, 1.0))
            .with(Landmark::LeftShoulder, LandmarkPoint::new(0.6, 0.3, 1.0))
            .with(Landmark::RightShoulder, LandmarkPoint::new(0.4, 0.3, 1.0))
            .with(Landmark::LeftElbow, LandmarkPoint::new(0.7, 0.4, 1.0))
            .with(Landmark::RightElbow, LandmarkPoint::new(0.3, 0.4, 1.0))
            .with(Landmark::LeftWrist, LandmarkPoint::new(0.7, 0.5, 1.0))
            .with(Landmark::RightWrist, LandmarkPoint::new(0.3, 0.5, 1.0))
            .with(Landmark::LeftHip, LandmarkPoint::new(0.6, 0.6, 1.0))
            .with(Landmark::RightHip, LandmarkPoint::new(0.4, 0.6, 1.0))
            .with(Landmark::LeftKnee, LandmarkPoint::new(0.6, 0.75, 1.0))
            .with(Landmark::RightKnee, LandmarkPoint::new(0.4, 0.75, 1.0))
            .with(Landmark::LeftAnkle, LandmarkPoint::new(0.6, 0.9, 1.0))
            .with(Landmark::RightAnkle, LandmarkPoint::new(0.4, 0.9, 1.0))
    }

    #[test]
    fn test_angle_label() {
        assert_eq!(angle_label(0.0), "N/A");
        assert_eq!(angle_label(179.9), "179°");
        assert_eq!(angle_label(90.0), "90°");
        assert_eq!(angle_label(0.4), "0°");
    }

    #[test]
    fn test_marker_drawn_at_landmark() {
        let landmarks = pose();
        let angles = compute_angles(&landmarks).unwrap();
        let mut frame = Frame::filled(200, 200, BLACK);

        annotate(&mut frame, &landmarks, &angles);

        // Nose at (100, 20) sits under a filled red marker
        assert_eq!(frame.pixel(100, 20), Some([255, 0, 0]));
        assert_eq!(frame.pixel(103, 20), Some([255, 0, 0]));
    }

    #[test]
    fn test_bone_drawn_between_endpoints() {
        let landmarks = pose();
        let angles = compute_angles(&landmarks).unwrap();
        let mut frame = Frame::filled(200, 200, BLACK);

        annotate(&mut frame, &landmarks, &angles);

        // Midpoint of the left knee -> left ankle bone: (120, 165)
        let on_bone = (118..=122).any(|x| frame.pixel(x, 165) == Some([255, 255, 255]));
        assert!(on_bone);
    }

    #[test]
    fn test_bone_skipped_when_endpoint_missing() {
        let landmarks = LandmarkSet::new()
            .with(Landmark::LeftHip, LandmarkPoint::new(0.5, 0.1, 1.0))
            .with(Landmark::LeftAnkle, LandmarkPoint::new(0.5, 0.9, 1.0));
        let mut frame = Frame::filled(100, 100, BLACK);

        annotate(&mut frame, &landmarks, &JointAngleSet::default());

        // No knee, so neither hip-knee nor knee-ankle is drawn
        assert_eq!(frame.pixel(50, 50), Some(BLACK));
    }

    #[test]
    fn test_labels_drawn_near_joints() {
        let landmarks = pose();
        let angles = compute_angles(&landmarks).unwrap();
        let mut frame = Frame::filled(200, 200, BLACK);

        annotate(&mut frame, &landmarks, &angles);

        // Label for LEFT_KNEE is anchored at (130, 140) and grows right/up
        let has_label = (130..170)
            .flat_map(|x| (120..142).map(move |y| (x, y)))
            .any(|(x, y)| frame.pixel(x, y) == Some([255, 255, 0]));
        assert!(has_label);
    }

    #[test]
    fn test_annotation_is_deterministic() {
        let landmarks = pose();
        let angles = compute_angles(&landmarks).unwrap();

        let mut first = Frame::filled(160, 120, [10, 20, 30]);
        let mut second = first.clone();
        annotate(&mut first, &landmarks, &angles);
        annotate(&mut second, &landmarks, &angles);

        assert_eq!(first, second);
    }

    #[test]
    fn test_offscreen_landmarks_do_not_panic() {
        let landmarks = LandmarkSet::new()
            .with(Landmark::LeftShoulder, LandmarkPoint::new(-0.5, 1.5, 0.2))
            .with(Landmark::LeftElbow, LandmarkPoint::new(2.0, -1.0, 0.2));
        let mut frame = Frame::filled(32, 32, BLACK);

        annotate(&mut frame, &landmarks, &JointAngleSet::default());
    }
}
