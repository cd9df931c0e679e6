use image::RgbaImage;
use socratic_lens::overlay::{
    AnnotationOverlay, BackgroundImage, BrushConfig, BrushSize, ImageError, ImageLoad,
    ImageSource, InkLayer, LayoutRect, Point, PointerAction, PointerEvent, Primitive,
    ResizePolicy, Rgb, Rgba, StrokePhase, Tool,
};

const BLUE: [u8; 4] = [0, 0, 255, 255];

fn background(width: u32, height: u32) -> BackgroundImage {
    BackgroundImage::from_rgba(RgbaImage::from_pixel(width, height, image::Rgba(BLUE)))
        .expect("non-empty background")
}

fn ready_overlay(container: LayoutRect) -> AnnotationOverlay {
    let mut overlay = AnnotationOverlay::<InkLayer>::new(container, ResizePolicy::Fixed);
    assert!(overlay.on_image_decoded(Ok(background(800, 600))));
    overlay
}

fn stroke(overlay: &mut AnnotationOverlay, points: &[(f32, f32)]) {
    let (first, rest) = points.split_first().expect("at least one point");
    overlay.handle_pointer(&PointerEvent::mouse(PointerAction::Press, first.0, first.1));
    for (x, y) in rest {
        overlay.handle_pointer(&PointerEvent::mouse(PointerAction::Move, *x, *y));
    }
    overlay.handle_pointer(&PointerEvent::mouse(PointerAction::Release, 0.0, 0.0));
}

fn assert_close(actual: [u8; 4], expected: [u8; 4]) {
    for (a, e) in actual.iter().zip(expected) {
        assert!(a.abs_diff(e) <= 1, "{actual:?} != {expected:?}");
    }
}

fn ink_at(overlay: &AnnotationOverlay, x: u32, y: u32) -> Rgba {
    overlay.ink().expect("ink layer").pixel(x, y)
}

#[test]
fn primitives_equal_one_plus_extends() {
    let mut overlay = ready_overlay(LayoutRect::new(0.0, 0.0, 400.0, 300.0));
    let mut expected = 0;
    for extends in 0..12u32 {
        let mut points = vec![(20.0, 20.0)];
        for i in 0..extends {
            // Mix of tiny and large jumps; speed must not matter.
            let step = if i % 2 == 0 { 0.5 } else { 37.0 };
            points.push((20.0 + step * i as f32 % 350.0, 20.0 + i as f32 * 3.0));
        }
        stroke(&mut overlay, &points);
        expected += 1 + extends as u64;
        assert_eq!(overlay.primitives_rendered(), expected);
        assert_eq!(overlay.phase(), StrokePhase::Idle);
    }
}

#[test]
fn single_press_draws_dot_of_brush_diameter() {
    let mut overlay = ready_overlay(LayoutRect::new(0.0, 0.0, 400.0, 300.0));
    overlay.set_brush(BrushConfig::new(Tool::Pen, Rgb::RED, BrushSize::ExtraThick));

    let dot = overlay.engage(Point::new(100.0, 100.0));
    overlay.disengage();
    assert_eq!(
        dot,
        Some(Primitive::Dot {
            center: Point::new(100.0, 100.0),
            radius: 8.0,
        })
    );

    let ink = overlay.ink().expect("ink");
    assert_eq!(ink.pixel(100, 100).a, 255);
    assert_eq!(ink.pixel(100, 92).a, 255);
    assert_eq!(ink.pixel(100, 90).a, 0);
    assert_eq!(ink.pixel(108, 100).a, 0);
    let painted = ink.painted_pixels() as f32;
    let area = std::f32::consts::PI * 8.0 * 8.0;
    assert!((painted - area).abs() < area * 0.1, "painted {painted} vs {area}");
    assert_eq!(overlay.primitives_rendered(), 1);
}

#[test]
fn device_coordinates_shift_by_surface_offset() {
    let mut overlay = ready_overlay(LayoutRect::new(35.0, 70.0, 400.0, 300.0));

    let mouse = overlay.handle_pointer(&PointerEvent::mouse(PointerAction::Press, 135.0, 90.0));
    assert_eq!(
        mouse,
        Some(Primitive::Dot {
            center: Point::new(100.0, 20.0),
            radius: 2.0,
        })
    );
    overlay.disengage();

    let touch = overlay.handle_pointer(&PointerEvent::touch(
        PointerAction::Press,
        vec![Point::new(36.5, 71.5), Point::new(300.0, 300.0)],
    ));
    assert_eq!(
        touch,
        Some(Primitive::Dot {
            center: Point::new(1.5, 1.5),
            radius: 2.0,
        })
    );
    let segment = overlay.handle_pointer(&PointerEvent::touch(
        PointerAction::Move,
        vec![Point::new(45.0, 80.0)],
    ));
    assert_eq!(
        segment,
        Some(Primitive::Segment {
            from: Point::new(1.5, 1.5),
            to: Point::new(10.0, 10.0),
        })
    );
}

#[test]
fn eraser_reveals_background_regardless_of_ink_color() {
    let mut overlay = ready_overlay(LayoutRect::new(0.0, 0.0, 400.0, 300.0));
    overlay.set_brush(BrushConfig::new(Tool::Pen, Rgb::RED, BrushSize::Thick));
    stroke(&mut overlay, &[(20.0, 50.0), (200.0, 50.0)]);
    overlay.set_brush(BrushConfig::new(Tool::Pen, Rgb::new(0, 200, 0), BrushSize::Thick));
    stroke(&mut overlay, &[(150.0, 20.0), (150.0, 80.0)]);
    assert_eq!(ink_at(&overlay, 100, 50).a, 255);
    assert_eq!(ink_at(&overlay, 150, 50).a, 255);

    // Color of the eraser brush must not matter.
    overlay.set_brush(BrushConfig::new(Tool::Eraser, Rgb::WHITE, BrushSize::ExtraThick));
    stroke(&mut overlay, &[(100.0, 20.0), (100.0, 80.0)]);
    stroke(&mut overlay, &[(150.0, 50.0)]);

    assert_eq!(ink_at(&overlay, 100, 50).a, 0);
    assert_eq!(ink_at(&overlay, 150, 50).a, 0);
    assert_eq!(ink_at(&overlay, 30, 50).a, 255);

    let flat = overlay.flatten(Rgba::new(255, 255, 255, 255)).expect("flatten");
    assert_eq!(flat.dimensions(), (400, 300));
    assert_close(flat.get_pixel(100, 50).0, BLUE);
    assert_close(flat.get_pixel(150, 50).0, BLUE);
    assert_close(flat.get_pixel(30, 50).0, [0xef, 0x44, 0x44, 255]);
}

#[test]
fn highlighter_accumulates_and_pen_occludes() {
    let mut overlay = ready_overlay(LayoutRect::new(0.0, 0.0, 400.0, 300.0));
    overlay.set_brush(BrushConfig::new(Tool::Highlighter, Rgb::new(250, 204, 21), BrushSize::Thick));

    stroke(&mut overlay, &[(50.0, 100.0), (150.0, 100.0)]);
    let single = ink_at(&overlay, 100, 100);
    stroke(&mut overlay, &[(100.0, 60.0), (100.0, 140.0)]);
    let double = ink_at(&overlay, 100, 100);
    assert!(single.a > 0 && single.a < 255);
    assert!(double.a > single.a, "{double:?} should be more opaque than {single:?}");
    assert_eq!(ink_at(&overlay, 60, 100), single);

    overlay.set_brush(BrushConfig::new(Tool::Pen, Rgb::new(10, 20, 30), BrushSize::Thick));
    stroke(&mut overlay, &[(90.0, 100.0), (110.0, 100.0)]);
    assert_eq!(ink_at(&overlay, 100, 100), Rgba::new(10, 20, 30, 255));
}

#[test]
fn nothing_renders_before_surface_is_sized() {
    let container = LayoutRect::new(0.0, 0.0, 400.0, 300.0);
    let mut overlay = AnnotationOverlay::<InkLayer>::new(container, ResizePolicy::Fixed);

    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(RgbaImage::from_pixel(80, 60, image::Rgba(BLUE)))
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageOutputFormat::Png,
        )
        .expect("encode png");
    let mut load = ImageLoad::spawn(ImageSource::Bytes(bytes));

    stroke(&mut overlay, &[(10.0, 10.0), (20.0, 20.0), (30.0, 30.0)]);
    assert!(!overlay.is_ready());
    assert_eq!(overlay.primitives_rendered(), 0);
    assert_eq!(overlay.surface_size(), None);

    assert!(!overlay.on_image_decoded(Err(ImageError::Empty)));
    stroke(&mut overlay, &[(10.0, 10.0), (20.0, 20.0)]);
    assert_eq!(overlay.primitives_rendered(), 0);

    let decoded = loop {
        if let Some(result) = load.try_take() {
            break result;
        }
        std::thread::sleep(std::time::Duration::from_millis(5));
    };
    assert!(overlay.on_image_decoded(decoded));
    stroke(&mut overlay, &[(10.0, 10.0), (20.0, 20.0)]);
    assert_eq!(overlay.primitives_rendered(), 2);
}

#[test]
fn surface_follows_container_not_image() {
    let container = LayoutRect::new(120.0, 48.0, 400.0, 300.0);
    let mut overlay = ready_overlay(container);
    assert_eq!(overlay.surface_size(), Some((400, 300)));

    let dot = overlay.handle_pointer(&PointerEvent::mouse(PointerAction::Press, 120.0, 48.0));
    assert_eq!(
        dot,
        Some(Primitive::Dot {
            center: Point::new(0.0, 0.0),
            radius: 2.0,
        })
    );
}

#[test]
fn fixed_surface_ignores_later_resizes() {
    let mut overlay = ready_overlay(LayoutRect::new(0.0, 0.0, 400.0, 300.0));
    overlay.on_container_resized(LayoutRect::new(0.0, 0.0, 640.0, 480.0));
    assert_eq!(overlay.surface_size(), Some((400, 300)));

    let mut follow = AnnotationOverlay::<InkLayer>::new(
        LayoutRect::new(0.0, 0.0, 400.0, 300.0),
        ResizePolicy::Follow,
    );
    follow.on_image_decoded(Ok(background(800, 600)));
    stroke(&mut follow, &[(10.0, 10.0)]);
    follow.on_container_resized(LayoutRect::new(0.0, 0.0, 200.0, 100.0));
    assert_eq!(follow.surface_size(), Some((200, 100)));
    assert_eq!(follow.ink().expect("ink").pixel(10, 10).a, 255);
}
