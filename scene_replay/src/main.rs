//! Scene replay
//!
//! Replays a scripted command stream against a scene store, running one
//! projection pass per frame against the headless backend, and prints the
//! resulting tree.
//!
//! ```text
//! scene_replay [replay.toml | replay.ron]
//! ```

use std::path::Path;

use scene_tree::config::{Config, ConfigError, SceneTreeConfig};
use scene_tree::foundation::logging;
use scene_tree::render::HeadlessBackend;
use scene_tree::scene::{path, SceneCommand, SceneError, SceneProjector, SceneStore};
use serde::{Deserialize, Serialize};

/// Replay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct ReplayConfig {
    /// RON command script
    script: String,
    /// Optional scene tree config (toml or ron)
    scene_config: Option<String>,
    /// Empty passes run after the script, to show the tree settles
    idle_frames: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            script: "scene_replay/scripts/demo.ron".to_string(),
            scene_config: None,
            idle_frames: 1,
        }
    }
}

impl Config for ReplayConfig {}

/// Commands grouped by frame; each frame is followed by one projection pass
#[derive(Debug, Deserialize)]
struct ReplayScript {
    frames: Vec<Vec<SceneCommand>>,
}

#[derive(thiserror::Error, Debug)]
enum ReplayError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to read script {path}: {source}")]
    Script {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse script {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("Frame {frame}: {source}")]
    Scene { frame: usize, source: SceneError },
}

fn load_script(path: &str) -> Result<ReplayScript, ReplayError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ReplayError::Script {
        path: path.to_string(),
        source,
    })?;
    ron::from_str(&contents).map_err(|e| ReplayError::Parse {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

fn load_scene_config(config: &ReplayConfig) -> Result<SceneTreeConfig, ConfigError> {
    match &config.scene_config {
        Some(path) => SceneTreeConfig::load_from_file(path),
        None => Ok(SceneTreeConfig::default()),
    }
}

fn print_tree(store: &SceneStore, projector: &SceneProjector, node_path: &str, depth: usize) {
    let Some(node) = store.node(node_path) else {
        return;
    };

    let name = if node_path == path::ROOT_PATH { "(root)" } else { node.name() };
    let hidden = if store.visibility(node_path) == Some(false) { " [hidden]" } else { "" };
    let mounted = if projector.is_mounted(node_path) { "" } else { " [unmounted]" };
    println!("{}{} <{}>{}{}", "  ".repeat(depth), name, node.factory().describe(), hidden, mounted);

    for child in node.children() {
        print_tree(store, projector, child, depth + 1);
    }
}

fn run(config: &ReplayConfig) -> Result<(), ReplayError> {
    let scene_config = load_scene_config(config)?;
    let script = load_script(&config.script)?;
    log::info!(
        "Replaying {} frames from {} (strict: {})",
        script.frames.len(),
        config.script,
        scene_config.strict
    );

    let mut store = SceneStore::with_config(scene_config);
    let mut projector = SceneProjector::new(&mut store);
    let mut backend = HeadlessBackend::new();

    let report = projector.update(&mut store, &mut backend);
    log::info!("Initial pass: mounted {}", report.mounted);

    for (frame, commands) in script.frames.into_iter().enumerate() {
        log::debug!("Frame {frame}: {} commands", commands.len());
        store
            .apply_all(commands)
            .map_err(|source| ReplayError::Scene { frame, source })?;

        let report = projector.update(&mut store, &mut backend);
        log::info!(
            "Frame {frame}: mounted {}, unmounted {}, attribute updates {}",
            report.mounted,
            report.unmounted,
            report.attribute_updates
        );
        for failed in &report.failures {
            log::warn!("Frame {frame}: factory failed for '{failed}'");
        }
        for error in &report.errors {
            log::error!("Frame {frame}: backend error: {error}");
        }
    }

    for idle in 0..config.idle_frames {
        let report = projector.update(&mut store, &mut backend);
        if !report.is_idle() {
            log::warn!("Idle frame {idle} was not idle: {report:?}");
        }
    }

    println!(
        "Scene: {} nodes, {} backend objects, revision {}",
        store.node_count(),
        backend.len(),
        store.revision()
    );
    print_tree(&store, &projector, path::ROOT_PATH, 0);
    Ok(())
}

fn main() {
    logging::init();

    let config = match std::env::args().nth(1) {
        Some(path) if Path::new(&path).exists() => match ReplayConfig::load_from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Failed to load replay config {path}: {e}");
                std::process::exit(2);
            }
        },
        Some(path) => {
            log::error!("Replay config {path} does not exist");
            std::process::exit(2);
        }
        None => ReplayConfig::default(),
    };

    if let Err(e) = run(&config) {
        log::error!("Replay failed: {e}");
        std::process::exit(1);
    }
}
