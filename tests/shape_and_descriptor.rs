use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_polygon_mut};
use imageproc::point::Point;
use imageproc::rect::Rect as DrawRect;
use screenmatch::lowlevel::{dominant_contour, ShapeVerifier};
use screenmatch::{analyze, DescriptorCache, OwnedImage, ShapeClass, ShapeDescriptor, Template};
use std::sync::Arc;

fn canvas(size: u32) -> GrayImage {
    GrayImage::new(size, size)
}

fn owned(img: &GrayImage) -> OwnedImage {
    OwnedImage::new(img.as_raw().clone(), img.width() as usize, img.height() as usize).unwrap()
}

fn describe(img: &GrayImage) -> ShapeDescriptor {
    let contour = dominant_contour(owned(img).view()).expect("foreground present");
    ShapeDescriptor::from_contour(&contour)
}

fn circle(size: u32, radius: i32) -> GrayImage {
    let mut img = canvas(size);
    let c = size as i32 / 2;
    draw_filled_circle_mut(&mut img, (c, c), radius, Luma([255]));
    img
}

#[test]
fn filled_circle_is_circle() {
    let shape = describe(&circle(100, 30));
    assert_eq!(shape.class, ShapeClass::Circle);
    assert!(shape.circularity > 0.8, "{shape:?}");
    assert!((shape.area - std::f64::consts::PI * 900.0).abs() < 300.0);
}

#[test]
fn filled_square_is_square() {
    let mut img = canvas(100);
    draw_filled_rect_mut(&mut img, DrawRect::at(30, 30).of_size(40, 40), Luma([255]));
    let shape = describe(&img);
    assert_eq!(shape.class, ShapeClass::Square);
    assert_eq!(shape.vertices, 4);
    assert!(shape.circularity < 0.8);
}

#[test]
fn wide_bar_is_rectangle() {
    let mut img = canvas(100);
    draw_filled_rect_mut(&mut img, DrawRect::at(10, 40).of_size(70, 20), Luma([255]));
    let shape = describe(&img);
    assert_eq!(shape.class, ShapeClass::Rectangle);
    assert_eq!(shape.vertices, 4);
}

#[test]
fn filled_triangle_is_triangle() {
    let mut img = canvas(100);
    draw_polygon_mut(
        &mut img,
        &[Point::new(15, 85), Point::new(85, 85), Point::new(50, 15)],
        Luma([255]),
    );
    let shape = describe(&img);
    assert_eq!(shape.class, ShapeClass::Triangle);
    assert_eq!(shape.vertices, 3);
}

#[test]
fn largest_contour_wins() {
    let mut img = canvas(120);
    draw_filled_rect_mut(&mut img, DrawRect::at(5, 5).of_size(10, 10), Luma([255]));
    draw_filled_circle_mut(&mut img, (70, 70), 35, Luma([255]));
    assert_eq!(describe(&img).class, ShapeClass::Circle);
}

#[test]
fn blank_template_has_empty_shape() {
    let tpl = Template::new(vec![20; 16 * 16], 16, 16).unwrap();
    let desc = analyze(&tpl);
    assert_eq!(desc.shape, ShapeDescriptor::empty());
    assert_eq!(desc.mean_rgb, [20.0; 3]);
}

#[test]
fn verifier_is_scale_tolerant_and_rejects_other_shapes() {
    let reference = circle(60, 20);
    let verifier = ShapeVerifier::new(owned(&reference).view(), 0.8).unwrap();

    let bigger = circle(80, 30);
    let score = verifier.similarity(owned(&bigger).view()).unwrap();
    assert!(score > 0.9, "circle vs circle: {score}");

    let mut bar = canvas(100);
    draw_filled_rect_mut(&mut bar, DrawRect::at(10, 45).of_size(80, 10), Luma([255]));
    let score = verifier.similarity(owned(&bar).view()).unwrap();
    assert!(score < 0.5, "circle vs bar: {score}");

    assert_eq!(verifier.similarity(owned(&canvas(30)).view()), None);
}

#[test]
fn solid_color_descriptor() {
    let rgb = RgbImage::from_pixel(12, 8, Rgb([255, 255, 0]));
    let desc = analyze(&Template::from_rgb(rgb).unwrap());
    assert_eq!(desc.mean_rgb, [255.0, 255.0, 0.0]);
    assert_eq!(desc.mean_hsv, [30.0, 255.0, 255.0]);
    assert_eq!(desc.std_hsv, [0.0; 3]);
    assert_eq!(desc.color_range.lower(), [30, 255, 255]);
    assert_eq!(desc.color_range.upper(), [30, 255, 255]);
    let auto = desc.auto_filter_range();
    assert_eq!(auto.lower(), [10, 205, 205]);
    assert_eq!(auto.upper(), [50, 255, 255]);
}

#[test]
fn cache_shares_descriptors_across_threads() {
    let cache = Arc::new(DescriptorCache::new());
    let tpl = Arc::new(Template::new((0..=255).collect(), 16, 16).unwrap());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let tpl = Arc::clone(&tpl);
            std::thread::spawn(move || cache.get_or_analyze(&tpl))
        })
        .collect();
    let descs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for d in &descs[1..] {
        assert_eq!(**d, *descs[0]);
    }
    assert_eq!(cache.len(), 1);
}

#[test]
fn single_foreground_pixel_is_analyzed_without_panicking() {
    let mut rgb = RgbImage::from_pixel(8, 8, Rgb([10, 10, 10]));
    rgb.put_pixel(5, 2, Rgb([255, 255, 255]));
    let desc = analyze(&Template::from_rgb(rgb).unwrap());
    assert_eq!(desc.shape.class, ShapeClass::Polygon);
    assert_eq!(desc.shape.perimeter, 0.0);
    assert_eq!(desc.shape.circularity, 0.0);
}
