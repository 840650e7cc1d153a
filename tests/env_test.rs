use std::{cell::RefCell, collections::HashSet, rc::Rc};

use flow_twodee::{
    Env, EnvBlock, EnvOpts, Error, MissingTexture, SceneGraph, Sprite, TextureRegistry, build_env,
    data_structures::env::{color_key, premultiply},
    load_env,
};
use image::{DynamicImage, Rgba};

use crate::common::test_utils::{
    RecordingTarget, image_from_pixels, init_logger, registry_with, temp_path, write_png,
};

mod common;

const RED: [u8; 4] = [255, 0, 0, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];
const CLEAR: [u8; 4] = [0, 0, 0, 0];

fn opts(blocks: Vec<EnvBlock>) -> EnvOpts {
    EnvOpts {
        blocks,
        texture_name: "tiles".to_string(),
        block_width: 16,
        block_height: 8,
        frames: 4,
        ..Default::default()
    }
}

fn sprite_positions(graph: &SceneGraph, env: flow_twodee::NodeId) -> Vec<(f32, f32)> {
    graph
        .children(env)
        .iter()
        .map(|&id| graph.global_position(id))
        .collect()
}

#[test]
fn color_key_packs_premultiplied_channels() {
    assert_eq!(color_key(Rgba([0xffff, 0, 0, 0xffff])), 0xff00ffff);
    assert_eq!(color_key(Rgba([0, 0, 0xffff, 0xffff])), 0x100feff);
    assert_eq!(color_key(Rgba([0x1234, 0x5678, 0x9abc, 0xdef0])), 0x8b139af0);
    assert_eq!(color_key(Rgba([0, 0, 0, 0])), 0);
}

#[test]
fn premultiply_scales_by_alpha() {
    assert_eq!(
        premultiply(Rgba([0xffff, 0x8000, 0x1234, 0xffff])),
        Rgba([0xffff, 0x8000, 0x1234, 0xffff])
    );
    assert_eq!(premultiply(Rgba([0xffff, 0xffff, 0xffff, 0])), Rgba([0, 0, 0, 0]));
    assert_eq!(
        premultiply(Rgba([0xffff, 0, 0, 0x8080])),
        Rgba([0x8080, 0, 0, 0x8080])
    );
}

#[test]
fn block_key_matches_the_widened_colour() {
    let block = EnvBlock::new(1, Rgba(RED), 0);
    assert_eq!(block.key(), 0xff00ffff);
}

#[test]
fn loads_recognized_pixels_from_a_png() {
    init_logger();
    let textures = registry_with("tiles", 64, 8);
    let mut graph = SceneGraph::new();
    let mut opts = opts(vec![EnvBlock::new(1, Rgba(RED), 2)]);
    opts.map_path = write_png("red-blue", &image_from_pixels(2, 1, &[RED, BLUE]));

    let env = load_env(&mut graph, &textures, &opts).unwrap();

    let node = graph.get::<Env>(env).unwrap();
    assert_eq!((node.width, node.height), (32, 8));
    assert_eq!(graph.children(env).len(), 1);
    let child = graph.children(env)[0];
    assert_eq!(graph.global_position(child), (0.0, 0.0));
    let sprite = graph.get::<Sprite>(child).unwrap();
    assert_eq!((sprite.width, sprite.height), (16, 8));
    assert_eq!((sprite.frames, sprite.frame), (4, 2));
    assert_eq!(sprite.texture().unwrap().label(), "tiles");
}

#[test]
fn sprites_are_placed_row_major_on_the_grid() {
    let textures = registry_with("tiles", 64, 8);
    let mut graph = SceneGraph::new();
    let opts = opts(vec![
        EnvBlock::new(1, Rgba(RED), 0),
        EnvBlock::new(2, Rgba(GREEN), 1),
    ]);
    let map = image_from_pixels(3, 2, &[RED, CLEAR, GREEN, GREEN, RED, BLUE]);

    let env = build_env(&mut graph, &textures, &opts, &DynamicImage::ImageRgba8(map)).unwrap();

    assert_eq!(
        sprite_positions(&graph, env),
        vec![(0.0, 0.0), (32.0, 0.0), (0.0, 8.0), (16.0, 8.0)]
    );
    let frames: Vec<u32> = graph
        .children(env)
        .iter()
        .map(|&id| graph.get::<Sprite>(id).unwrap().frame)
        .collect();
    assert_eq!(frames, vec![0, 1, 1, 0]);
}

#[test]
fn env_children_follow_the_env_position() {
    let textures = registry_with("tiles", 64, 8);
    let mut graph = SceneGraph::new();
    let opts = opts(vec![EnvBlock::new(1, Rgba(RED), 0)]);
    let map = image_from_pixels(2, 1, &[CLEAR, RED]);

    let env = build_env(&mut graph, &textures, &opts, &DynamicImage::ImageRgba8(map)).unwrap();
    let node = graph.get_mut::<Env>(env).unwrap();
    node.element.x = 100.0;
    node.element.y = 50.0;

    assert_eq!(sprite_positions(&graph, env), vec![(116.0, 50.0)]);
}

#[test]
fn handler_runs_for_every_placed_sprite() {
    let textures = registry_with("tiles", 64, 8);
    let mut graph = SceneGraph::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    let opts = opts(vec![EnvBlock::new(7, Rgba(RED), 0).on_loaded(
        move |id, sprite: &mut Sprite, block: &EnvBlock| {
            sprite.velocity_x = 1.5;
            log.borrow_mut().push((id, block.kind));
        },
    )]);
    let map = image_from_pixels(3, 1, &[RED, BLUE, RED]);

    let env = build_env(&mut graph, &textures, &opts, &DynamicImage::ImageRgba8(map)).unwrap();

    let children = graph.children(env).to_vec();
    assert_eq!(
        *seen.borrow(),
        vec![(children[0], 7), (children[1], 7)]
    );
    for id in children {
        assert_eq!(graph.parent(id), Some(env));
        assert_eq!(graph.get::<Sprite>(id).unwrap().velocity_x, 1.5);
    }
}

#[test]
fn handler_tags_let_callers_skip_blocks_in_collisions() {
    let textures = registry_with("tiles", 64, 8);
    let mut graph = SceneGraph::new();
    let coins = Rc::new(RefCell::new(HashSet::new()));
    let tagged = coins.clone();
    let opts = opts(vec![
        EnvBlock::new(0, Rgba(RED), 0),
        EnvBlock::new(1, Rgba(GREEN), 1).on_loaded(
            move |id, _: &mut Sprite, _: &EnvBlock| {
                tagged.borrow_mut().insert(id);
            },
        ),
    ]);
    // ground, coin, empty
    let map = image_from_pixels(3, 1, &[RED, GREEN, CLEAR]);
    let env = build_env(&mut graph, &textures, &opts, &DynamicImage::ImageRgba8(map)).unwrap();
    let player = graph.insert(Sprite::new(&textures, "tiles", 40.0, 0.0, 4, 4, 1).unwrap());

    let coins = coins.borrow();
    let solid: Vec<_> = graph
        .children(env)
        .iter()
        .copied()
        .filter(|id| !coins.contains(id))
        .collect();
    // moving left onto the coin at x 16..32 only hits it when coins are solid
    let blocked_by = |blocks: &[flow_twodee::NodeId]| {
        blocks
            .iter()
            .any(|&block| !graph.test_move(player, -10.0, 0.0, block))
    };

    assert_eq!(coins.len(), 1);
    assert_eq!(solid.len(), 1);
    assert!(blocked_by(graph.children(env)));
    assert!(!blocked_by(&solid));
}

#[test]
fn later_palette_entries_win() {
    let textures = registry_with("tiles", 64, 8);
    let mut graph = SceneGraph::new();
    let opts = opts(vec![
        EnvBlock::new(1, Rgba(RED), 1),
        EnvBlock::new(2, Rgba(RED), 3),
    ]);
    let map = image_from_pixels(1, 1, &[RED]);

    let env = build_env(&mut graph, &textures, &opts, &DynamicImage::ImageRgba8(map)).unwrap();

    let child = graph.children(env)[0];
    assert_eq!(graph.get::<Sprite>(child).unwrap().frame, 3);
}

#[test]
fn semi_transparent_colours_match() {
    let textures = registry_with("tiles", 64, 8);
    let mut graph = SceneGraph::new();
    let faded = [255, 0, 0, 128];
    let mut opts = opts(vec![EnvBlock::new(1, Rgba(faded), 0)]);
    opts.map_path = write_png("faded", &image_from_pixels(2, 1, &[RED, faded]));

    let env = load_env(&mut graph, &textures, &opts).unwrap();

    assert_eq!(sprite_positions(&graph, env), vec![(16.0, 0.0)]);
}

#[test]
fn huge_blocks_do_not_overflow_the_grid() {
    let textures = registry_with("tiles", 64, 8);
    let mut graph = SceneGraph::new();
    let mut opts = opts(vec![EnvBlock::new(1, Rgba(RED), 0)]);
    opts.block_width = 1 << 31;
    opts.block_height = u32::MAX;
    let map = image_from_pixels(2, 2, &[CLEAR, RED, CLEAR, CLEAR]);

    let env = build_env(&mut graph, &textures, &opts, &DynamicImage::ImageRgba8(map)).unwrap();

    let node = graph.get::<Env>(env).unwrap();
    assert_eq!(node.width, 1u64 << 32);
    assert_eq!(node.height, 2 * u64::from(u32::MAX));
    assert_eq!(sprite_positions(&graph, env), vec![(2147483648.0, 0.0)]);
}

#[test]
fn empty_palette_places_nothing() {
    let textures = registry_with("tiles", 64, 8);
    let mut graph = SceneGraph::new();
    let opts = opts(Vec::new());
    let map = image_from_pixels(2, 2, &[RED, GREEN, BLUE, CLEAR]);

    let env = build_env(&mut graph, &textures, &opts, &DynamicImage::ImageRgba8(map)).unwrap();

    assert!(graph.children(env).is_empty());
    let node = graph.get::<Env>(env).unwrap();
    assert_eq!((node.width, node.height), (32, 16));
}

#[test]
fn missing_map_file_leaves_the_graph_untouched() {
    let textures = registry_with("tiles", 64, 8);
    let mut graph = SceneGraph::new();
    let mut opts = opts(vec![EnvBlock::new(1, Rgba(RED), 0)]);
    opts.map_path = temp_path("missing.png");

    let err = load_env(&mut graph, &textures, &opts).unwrap_err();

    assert!(matches!(err, Error::MapIo { ref path, .. } if *path == opts.map_path));
    assert!(graph.is_empty());
}

#[test]
fn undecodable_map_leaves_the_graph_untouched() {
    let textures = registry_with("tiles", 64, 8);
    let mut graph = SceneGraph::new();
    let mut opts = opts(vec![EnvBlock::new(1, Rgba(RED), 0)]);
    opts.map_path = temp_path("garbage.png");
    std::fs::write(&opts.map_path, b"definitely not a png").unwrap();

    let err = load_env(&mut graph, &textures, &opts).unwrap_err();

    assert!(matches!(err, Error::MapDecode { .. }));
    assert!(graph.is_empty());
}

#[test]
fn missing_texture_fails_before_placing_anything() {
    let textures = TextureRegistry::new();
    let mut graph = SceneGraph::new();
    let opts = opts(vec![EnvBlock::new(1, Rgba(RED), 0)]);
    let map = image_from_pixels(1, 1, &[RED]);

    let err = build_env(&mut graph, &textures, &opts, &DynamicImage::ImageRgba8(map)).unwrap_err();

    assert!(matches!(err, Error::TextureNotFound(ref name) if name == "tiles"));
    assert!(graph.is_empty());
}

#[test]
fn blank_policy_builds_invisible_blocks() {
    let textures = TextureRegistry::new().with_missing_texture(MissingTexture::Blank);
    let mut graph = SceneGraph::new();
    let opts = opts(vec![EnvBlock::new(1, Rgba(RED), 0)]);
    let map = image_from_pixels(2, 1, &[RED, RED]);

    let env = build_env(&mut graph, &textures, &opts, &DynamicImage::ImageRgba8(map)).unwrap();
    let mut target = RecordingTarget::new();
    graph.draw(env, &mut target);

    assert_eq!(graph.children(env).len(), 2);
    assert!(target.calls.is_empty());
}
