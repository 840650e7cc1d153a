use std::{cell::RefCell, collections::HashSet, rc::Rc};

use flow_twodee::{
    Duration, EnvBlock, EnvOpts, NodeId, Scene, SceneGraph, Sprite, TextureRegistry, build_env,
    camera::Camera,
    config::{AppConfig, WindowConfig},
    event::{MouseAction, MouseEvent},
    layers::{Layer, Layers},
    render::QuadTarget,
};
use image::{DynamicImage, Rgba, RgbaImage};

const BLOCK: u32 = 32;
const WINDOW_WIDTH: u32 = 800;
const WINDOW_HEIGHT: u32 = 600;
const GRAVITY: f32 = 600.0;

const GROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);
const COIN: Rgba<u8> = Rgba([255, 200, 0, 255]);

/// Two frames side by side: a stone block and a coin.
fn tile_sheet() -> DynamicImage {
    let sheet = RgbaImage::from_fn(2 * BLOCK, BLOCK, |x, _| {
        if x < BLOCK {
            Rgba([110, 90, 70, 255])
        } else {
            Rgba([240, 190, 30, 255])
        }
    });
    DynamicImage::ImageRgba8(sheet)
}

fn level_map() -> DynamicImage {
    let rows = [
        "..........................",
        "..........................",
        ".....o..........o.o.......",
        "....###........#####......",
        "..........................",
        "..o.o.....o...............",
        "##########################",
    ];
    let width = rows[0].len() as u32;
    let map = RgbaImage::from_fn(width, rows.len() as u32, |x, y| {
        match rows[y as usize].as_bytes()[x as usize] {
            b'#' => GROUND,
            b'o' => COIN,
            _ => Rgba([255, 255, 255, 255]),
        }
    });
    DynamicImage::ImageRgba8(map)
}

struct Level {
    graph: SceneGraph,
    scene: NodeId,
    env: NodeId,
    player: NodeId,
    coins: Rc<RefCell<HashSet<NodeId>>>,
    camera: Camera,
}

impl Level {
    fn new() -> flow_twodee::Result<Self> {
        let mut textures = TextureRegistry::new();
        textures.insert("tiles", &tile_sheet());
        textures.insert(
            "player",
            &DynamicImage::ImageRgba8(RgbaImage::from_pixel(24, 24, Rgba([60, 140, 255, 255]))),
        );

        let mut graph = SceneGraph::new();
        let scene = graph.insert(Scene::new());
        let coins = Rc::new(RefCell::new(HashSet::new()));
        let placed = coins.clone();
        let opts = EnvOpts {
            blocks: vec![
                EnvBlock::new(0, GROUND, 0),
                EnvBlock::new(1, COIN, 1).on_loaded(
                    move |id, sprite: &mut Sprite, _: &EnvBlock| {
                        // coins float in front of the ground
                        sprite.element.z = 1;
                        placed.borrow_mut().insert(id);
                    },
                ),
            ],
            texture_name: "tiles".to_string(),
            block_width: BLOCK,
            block_height: BLOCK,
            frames: 2,
            ..Default::default()
        };
        let env = build_env(&mut graph, &textures, &opts, &level_map())?;
        graph.add_child(scene, env);

        let mut player = Sprite::new(&textures, "player", 64.0, 0.0, 24, 24, 1)?;
        player.element.z = 2;
        let player = graph.insert(player);
        graph.add_child(scene, player);

        Ok(Self {
            graph,
            scene,
            env,
            player,
            coins,
            camera: Camera::new(
                0.0,
                0.0,
                f64::from(WINDOW_WIDTH),
                f64::from(WINDOW_HEIGHT),
            ),
        })
    }

    /// Only ground blocks stop the player; coins are walked through.
    fn blocked(&self, dx: f32, dy: f32) -> bool {
        let coins = self.coins.borrow();
        self.graph
            .children(self.env)
            .iter()
            .filter(|&&block| !coins.contains(&block))
            .any(|&block| !self.graph.test_move(self.player, dx, dy, block))
    }

    fn collect_coins(&mut self) {
        let touched: Vec<NodeId> = self
            .coins
            .borrow()
            .iter()
            .copied()
            .filter(|&coin| self.graph.collides_with(self.player, coin))
            .collect();
        for coin in touched {
            self.coins.borrow_mut().remove(&coin);
            self.graph.remove(coin);
            log::info!("coin collected, {} left", self.coins.borrow().len());
        }
    }
}

impl Layer for Level {
    fn render(&mut self, target: &mut dyn QuadTarget) {
        self.camera.set_projection(target);
        self.graph.draw(self.scene, target);
    }

    fn update(&mut self, dt: Duration) {
        let dt = dt.as_secs_f32();
        let Some(player) = self.graph.get_mut::<Sprite>(self.player) else {
            return;
        };
        player.velocity_y += GRAVITY * dt;
        let (vx, vy) = (player.velocity_x, player.velocity_y);

        let dx = vx * dt;
        let dy = vy * dt;
        // touching the floor counts as a collision, so test one pixel higher
        let can_x = !self.blocked(dx, -1.0);
        let can_y = !self.blocked(0.0, dy);
        if let Some(player) = self.graph.get_mut::<Sprite>(self.player) {
            if can_x {
                player.element.x += dx;
            } else {
                player.velocity_x = -player.velocity_x;
            }
            if can_y {
                player.element.y += dy;
            } else {
                player.velocity_y = 0.0;
            }
        }
        self.collect_coins();
    }

    fn delete(&mut self) {
        log::info!("level closed with {} nodes", self.graph.len());
    }

    fn handle_mouse_event(&mut self, event: &MouseEvent) -> bool {
        if event.action == MouseAction::Press {
            if let Some(player) = self.graph.get_mut::<Sprite>(self.player) {
                player.velocity_y = -350.0;
                let half_width = f64::from(WINDOW_WIDTH) / 2.0;
                player.velocity_x = if event.x < half_width { -120.0 } else { 120.0 };
            }
        }
        true
    }
}

fn main() -> anyhow::Result<()> {
    let level = Level::new()?;
    let mut layers = Layers::new();
    layers.push(Box::new(level));

    let config = AppConfig {
        window: WindowConfig {
            title: "platformer".to_string(),
            width: WINDOW_WIDTH,
            height: WINDOW_HEIGHT,
        },
        ..Default::default()
    };
    flow_twodee::flow::run(config, layers)
}
