use gifsheet::{
    BackgroundSpec, ComposeOpts, EffectSettings, Frame, GridLayout, TargetSize, compose,
    compose_or_fallback,
};

const COLORS: [[u8; 4]; 5] = [
    [255, 0, 0, 255],
    [0, 255, 0, 255],
    [0, 0, 255, 255],
    [255, 255, 0, 255],
    [0, 255, 255, 255],
];

fn colored_frames(size: u32) -> Vec<Frame> {
    COLORS
        .iter()
        .map(|c| Frame::solid(size, size, *c))
        .collect()
}

#[test]
fn five_frames_fill_a_three_by_two_sheet() {
    let frames = colored_frames(64);
    let opts = ComposeOpts {
        background: BackgroundSpec::TRANSPARENT,
        avoid_single_row_for_odd_counts: true,
        ..ComposeOpts::default()
    };
    let sheet = compose(&frames, &opts, &EffectSettings::default()).unwrap();

    assert_eq!(sheet.grid, GridLayout { columns: 3, rows: 2 });
    assert_eq!(sheet.image.dimensions(), (192, 128));
    assert!(sheet.skipped.is_empty());

    let origins = [(0, 0), (64, 0), (128, 0), (0, 64), (64, 64)];
    for (index, (&origin, color)) in origins.iter().zip(COLORS).enumerate() {
        assert_eq!(sheet.tile_origin(index), origin);
        let (x, y) = origin;
        for (dx, dy) in [(0, 0), (63, 0), (0, 63), (63, 63), (31, 17)] {
            assert_eq!(sheet.image.get_pixel(x + dx, y + dy).0, color, "tile {index}");
        }
    }

    for (x, y) in [(128, 64), (191, 127), (150, 100)] {
        assert_eq!(sheet.image.get_pixel(x, y).0, [0, 0, 0, 0]);
    }
}

#[test]
fn composing_twice_gives_identical_pixels() {
    let frames = colored_frames(16);
    let opts = ComposeOpts {
        target: TargetSize::Fixed {
            width: 50,
            height: 30,
        },
        background: BackgroundSpec::rgba(10, 20, 30, 255),
        ..ComposeOpts::default()
    };
    let effects = EffectSettings {
        blur: true,
        blur_radius: 1.5,
        color_intensity: true,
        color_intensity_level: 0.8,
        ..EffectSettings::default()
    };
    let a = compose(&frames, &opts, &effects).unwrap();
    let b = compose(&frames, &opts, &effects).unwrap();
    assert_eq!(a, b);
}

#[test]
fn translucent_tiles_blend_with_the_background() {
    let frames = vec![Frame::solid(4, 4, [255, 0, 0, 128])];
    let opts = ComposeOpts {
        background: BackgroundSpec::WHITE,
        ..ComposeOpts::default()
    };
    let sheet = compose(&frames, &opts, &EffectSettings::default()).unwrap();
    let px = sheet.image.get_pixel(1, 1).0;
    assert_eq!(px[0], 255);
    assert!((126..=128).contains(&px[1]), "{px:?}");
    assert_eq!(px[1], px[2]);
    assert_eq!(px[3], 255);
}

#[test]
fn grayscale_keeps_alpha_on_a_transparent_canvas() {
    let frames = vec![
        Frame::solid(4, 4, [200, 40, 90, 100]),
        Frame::solid(4, 4, [10, 220, 30, 0]),
    ];
    let effects = EffectSettings {
        grayscale: true,
        ..EffectSettings::default()
    };
    let sheet = compose(&frames, &ComposeOpts::default(), &effects).unwrap();
    let first = sheet.image.get_pixel(0, 0).0;
    assert_eq!(first[3], 100);
    assert!(first[0] == first[1] && first[1] == first[2]);
    assert_eq!(sheet.image.get_pixel(5, 2).0[3], 0);
}

#[test]
fn transparency_factor_bounds() {
    let frames = vec![Frame::solid(4, 4, [255, 255, 255, 255])];
    let run = |factor: f32| {
        let effects = EffectSettings {
            transparency: true,
            transparency_factor: factor,
            ..EffectSettings::default()
        };
        compose(&frames, &ComposeOpts::default(), &effects)
            .unwrap()
            .image
            .get_pixel(0, 0)
            .0[3]
    };
    assert_eq!(run(0.0), 0);
    assert_eq!(run(1.0), 255);
    assert_eq!(run(0.5), 127);
}

#[test]
fn borderless_fixed_size_is_whole_tiles() {
    let frames = colored_frames(20);
    let opts = ComposeOpts {
        target: TargetSize::Fixed {
            width: 100,
            height: 70,
        },
        crop_to_content: true,
        ..ComposeOpts::default()
    };
    let sheet = compose(&frames, &opts, &EffectSettings::default()).unwrap();
    assert_eq!(sheet.grid, GridLayout { columns: 3, rows: 2 });
    assert_eq!(sheet.image.dimensions(), (99, 70));
    assert_eq!((sheet.tile.width, sheet.tile.height), (33, 35));
}

#[test]
fn fixed_size_without_crop_matches_target_exactly() {
    let frames = colored_frames(20);
    let opts = ComposeOpts {
        target: TargetSize::Fixed {
            width: 100,
            height: 70,
        },
        ..ComposeOpts::default()
    };
    let sheet = compose(&frames, &opts, &EffectSettings::default()).unwrap();
    assert_eq!(sheet.image.dimensions(), (100, 70));
}

#[test]
fn empty_frames_are_skipped_not_fatal() {
    let frames = vec![
        Frame::solid(8, 8, [255, 0, 0, 255]),
        Frame::from_raw(0, 0, Vec::new()).unwrap(),
        Frame::solid(8, 8, [0, 0, 255, 255]),
    ];
    let opts = ComposeOpts {
        background: BackgroundSpec::rgba(9, 9, 9, 255),
        ..ComposeOpts::default()
    };
    let outcome = compose_or_fallback(&frames, &opts, &EffectSettings::default());
    assert!(outcome.error.is_none());
    let sheet = &outcome.sheet;
    assert_eq!(sheet.skipped, vec![1]);
    assert_eq!(sheet.image.get_pixel(8, 0).0, [9, 9, 9, 255]);
    assert_eq!(sheet.image.get_pixel(16, 0).0, [0, 0, 255, 255]);
    assert!(outcome.status().is_some_and(|s| s.contains("1 frame")));
}
