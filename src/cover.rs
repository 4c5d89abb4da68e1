//! The social-card screenshot utility. For one post it opens the post's two
//! card render targets on the local dev server in a headless browser,
//! screenshots the window, and crops the platform-sized card PNGs into the
//! static source tree where the templates reference them.
//!
//! Planning which captures are pending ([`plan_captures`]) is separate from
//! executing them, so the skip rules (existing destination, per-post
//! opt-out) can be exercised without a browser. Captures run strictly
//! sequentially; this is an interactive authoring aid, and a failed
//! navigation is allowed to take the whole run down.

use anyhow::{anyhow, bail, Context, Result};
use std::net::{SocketAddr, TcpStream};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::generate::Platform;
use crate::post::{self, Node};

/// Browser window the card pages are laid out against. Crops are taken from
/// the window's origin, so the window must be at least as large as the
/// largest platform crop.
const WINDOW: (u32, u32) = (1020, 440);

/// Virtual-time budget granted to the page for loading background images,
/// in milliseconds.
const SETTLE_BUDGET_MS: u32 = 5_000;

/// How long to wait for the dev server before giving up.
const SERVER_TIMEOUT: Duration = Duration::from_secs(10);

/// Browser binaries searched on `PATH` when the project doesn't pin one via
/// the `browser` configuration field.
const BROWSERS: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
];

/// One pending screenshot: the dev-server URL to open, the crop to take,
/// and the file to write.
#[derive(Debug, PartialEq)]
pub struct Capture {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub destination: PathBuf,
}

/// Captures the social-card screenshots for the post identified by `slug`.
/// Already-captured targets and posts that opt out via `generate-card:
/// false` are skipped, so running this twice launches the browser only
/// once (the second run is a no-op).
pub fn capture_cards(config: &Config, slug: &str) -> Result<()> {
    let (nodes, _) = post::scan(&config.posts_source_directory, config.max_posts)?;
    let node = nodes
        .iter()
        .find(|node| node.slug() == slug)
        .ok_or_else(|| anyhow!("no content file with slug `{}`", slug))?;

    let captures = plan_captures(node, &config.static_source_directory, config.dev_port);
    if captures.is_empty() {
        log::info!("nothing to capture for `{}`", slug);
        return Ok(());
    }

    wait_for_server(config.dev_port, SERVER_TIMEOUT)?;
    let browser = resolve_browser(config.browser.as_deref())?;
    for capture in &captures {
        take_screenshot(&browser, capture)?;
        log::info!("created {}", capture.destination.display());
    }
    Ok(())
}

/// Decides which captures are pending for `node`: one per platform, minus
/// the ones whose destination file already exists, or all of them when the
/// post opts out of card generation.
pub fn plan_captures(node: &Node, static_directory: &Path, dev_port: u16) -> Vec<Capture> {
    if !node.generate_card() {
        return Vec::new();
    }

    Platform::ALL
        .iter()
        .filter_map(|&platform| {
            let destination = static_directory.join(format!(
                "{}-{}.png",
                node.slug(),
                platform.file_suffix()
            ));
            if destination.exists() {
                log::info!("skipping {} (already exists)", destination.display());
                return None;
            }
            let (width, height) = platform.crop();
            Some(Capture {
                url: format!(
                    "http://localhost:{}/{}/{}",
                    dev_port,
                    node.slug(),
                    platform.route_suffix()
                ),
                width,
                height,
                destination,
            })
        })
        .collect()
}

/// Waits until the dev server accepts TCP connections on `port`. The server
/// is the framework's dev process, started separately; checking up front
/// turns the "forgot to start it" case into a clear error instead of a
/// browser navigation failure.
pub fn wait_for_server(port: u16, timeout: Duration) -> Result<()> {
    let address = SocketAddr::from(([127, 0, 0, 1], port));
    let deadline = Instant::now() + timeout;
    loop {
        match TcpStream::connect_timeout(&address, Duration::from_millis(500)) {
            Ok(_) => return Ok(()),
            Err(e) => {
                if Instant::now() >= deadline {
                    return Err(e)
                        .with_context(|| format!("dev server is not listening on port {}", port));
                }
                thread::sleep(Duration::from_millis(500));
            }
        }
    }
}

fn resolve_browser(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        return Ok(path.to_owned());
    }
    for candidate in BROWSERS {
        if let Ok(path) = which::which(candidate) {
            return Ok(path);
        }
    }
    bail!(
        "no headless browser found on PATH (tried {}); set `browser` in site.yaml",
        BROWSERS.join(", ")
    )
}

/// Opens `capture.url` in a fresh headless browser process, screenshots the
/// window to a temporary file, and crops the platform-sized card out of it.
fn take_screenshot(browser: &Path, capture: &Capture) -> Result<()> {
    let window_file = capture.destination.with_extension("window.png");
    let status = Command::new(browser)
        .arg("--headless")
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--hide-scrollbars")
        .arg(format!("--window-size={},{}", WINDOW.0, WINDOW.1))
        .arg(format!("--virtual-time-budget={}", SETTLE_BUDGET_MS))
        .arg(format!("--screenshot={}", window_file.display()))
        .arg(&capture.url)
        .status()
        .with_context(|| format!("launching browser `{}`", browser.display()))?;
    if !status.success() {
        bail!("browser exited with {} capturing {}", status, capture.url);
    }

    let window = image::open(&window_file)
        .with_context(|| format!("reading window screenshot `{}`", window_file.display()))?;
    window
        .crop_imm(0, 0, capture.width, capture.height)
        .save(&capture.destination)
        .with_context(|| format!("writing `{}`", capture.destination.display()))?;
    std::fs::remove_file(&window_file)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::post::parse_node;

    fn node(generate_card: bool) -> Node {
        let input = format!(
            "---\ntitle: Alpha\ndate: 2021-04-16\ncategory: blog\ngenerate-card: {}\n---\nbody",
            generate_card
        );
        parse_node("alpha", &input).unwrap()
    }

    #[test]
    fn test_plan_captures_both_platforms() {
        let dir = tempfile::tempdir().unwrap();
        let captures = plan_captures(&node(true), dir.path(), 8000);
        assert_eq!(
            vec![
                Capture {
                    url: String::from("http://localhost:8000/alpha/image_tw"),
                    width: 800,
                    height: 418,
                    destination: dir.path().join("alpha-twitter.png"),
                },
                Capture {
                    url: String::from("http://localhost:8000/alpha/image_dev"),
                    width: 1000,
                    height: 420,
                    destination: dir.path().join("alpha-dev.png"),
                },
            ],
            captures
        );
    }

    #[test]
    fn test_plan_captures_skips_existing_destinations() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("alpha-twitter.png"), "png").unwrap();
        let captures = plan_captures(&node(true), dir.path(), 8000);
        assert_eq!(
            vec![dir.path().join("alpha-dev.png")],
            captures
                .iter()
                .map(|c| c.destination.clone())
                .collect::<Vec<_>>()
        );

        std::fs::write(dir.path().join("alpha-dev.png"), "png").unwrap();
        assert!(plan_captures(&node(true), dir.path(), 8000).is_empty());
    }

    #[test]
    fn test_plan_captures_honors_opt_out() {
        let dir = tempfile::tempdir().unwrap();
        assert!(plan_captures(&node(false), dir.path(), 8000).is_empty());
    }

    #[test]
    fn test_wait_for_server_listening() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(wait_for_server(port, Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn test_wait_for_server_timeout() {
        // bind-then-drop to find a port nothing is listening on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        assert!(wait_for_server(port, Duration::from_millis(50)).is_err());
    }
}
