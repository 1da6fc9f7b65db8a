use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use walkloop::config::SearchConfig;
use walkloop::error::{AppError, Result};
use walkloop::models::{Point, RouteGeometry};
use walkloop::services::osrm::RoutingProvider;
use walkloop::services::overpass::WalkableSource;
use walkloop::services::route_search::{geodesy, RegionalTemplates, RouteSearch};
use walkloop::storage::{MemoryStore, SuggestionStore};
use walkloop::WalkPlanner;

type RouteFn = dyn Fn(&[Point]) -> Result<Option<RouteGeometry>> + Send + Sync;

/// Routing provider whose answers come from a closure.
pub struct ScriptedRouter {
    respond: Box<RouteFn>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl ScriptedRouter {
    pub fn new<F>(respond: F) -> Arc<Self>
    where
        F: Fn(&[Point]) -> Result<Option<RouteGeometry>> + Send + Sync + 'static,
    {
        Arc::new(ScriptedRouter {
            respond: Box::new(respond),
            calls: AtomicUsize::new(0),
        })
    }

    /// Every loop is `meters` long and runs straight through its waypoints.
    pub fn fixed_length(meters: f64) -> Arc<Self> {
        Self::new(move |coords| Ok(Some(geometry_through(coords, meters))))
    }

    /// Every request fails at the transport level.
    pub fn failing() -> Arc<Self> {
        Self::new(|_| Err(AppError::RoutingApi("connection refused".to_string())))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoutingProvider for ScriptedRouter {
    async fn route_through(&self, coordinates: &[Point]) -> Result<Option<RouteGeometry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.respond)(coordinates)
    }
}

#[allow(dead_code)]
pub fn geometry_through(coords: &[Point], meters: f64) -> RouteGeometry {
    RouteGeometry {
        meters,
        seconds: meters / 1.3,
        geometry: coords.iter().map(|p| p.to_lng_lat()).collect(),
        legs: vec![],
    }
}

/// Walkable source returning fixed points, a failure, or a slow answer.
pub struct FakeWalkable {
    points: Vec<Point>,
    fail: bool,
    delay: Duration,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl FakeWalkable {
    pub fn with_points(points: Vec<Point>) -> Arc<Self> {
        Arc::new(FakeWalkable {
            points,
            fail: false,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn empty() -> Arc<Self> {
        Self::with_points(Vec::new())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(FakeWalkable {
            points: Vec::new(),
            fail: true,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn slow(points: Vec<Point>, delay: Duration) -> Arc<Self> {
        Arc::new(FakeWalkable {
            points,
            fail: false,
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalkableSource for FakeWalkable {
    async fn walkable_points(&self, _center: Point, _radius_m: f64) -> Result<Vec<Point>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(AppError::OverpassApi("HTTP 504: Gateway Timeout".to_string()));
        }
        Ok(self.points.clone())
    }
}

/// Seeded search tuning with a short sampler wait.
#[allow(dead_code)]
pub fn test_search_config() -> SearchConfig {
    SearchConfig {
        seed: Some(17),
        sampler_soft_timeout_ms: 300,
        ..SearchConfig::default()
    }
}

/// Outside every built-in reference region.
#[allow(dead_code)]
pub fn stockholm() -> Point {
    Point::new(59.3293, 18.0686).unwrap()
}

#[allow(dead_code)]
pub fn oslo() -> Point {
    Point::new(59.9139, 10.7522).unwrap()
}

/// Walkable points scattered on rings around `center`.
#[allow(dead_code)]
pub fn walkable_rings(center: Point, count: usize) -> Vec<Point> {
    (0..count)
        .map(|i| {
            let radius = 400.0 + (i % 5) as f64 * 150.0;
            geodesy::destination_point(center, radius, i as f64 * 360.0 / count as f64)
        })
        .collect()
}

/// Planner over fakes with an in-memory store.
#[allow(dead_code)]
pub fn planner_with(
    routing: Arc<dyn RoutingProvider>,
    walkable: Arc<dyn WalkableSource>,
    regions: RegionalTemplates,
) -> (WalkPlanner, Arc<MemoryStore>) {
    let backend = Arc::new(MemoryStore::new());
    let search = RouteSearch::new(routing, walkable, regions, test_search_config());
    let planner = WalkPlanner::new(search, SuggestionStore::new(backend.clone()));
    (planner, backend)
}

/// Live API tests only run when explicitly requested.
#[allow(dead_code)]
pub fn should_skip_live_api_tests() -> bool {
    std::env::var("RUN_LIVE_API_TESTS").is_err()
}

/// Serve canned HTTP responses on a local port, one per connection, and
/// return the base URL.
#[allow(dead_code)]
pub async fn serve_canned(status: u16, body: &'static str) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                // read the full request so closing does not reset the connection
                let mut request = Vec::new();
                let mut buf = [0u8; 4096];
                loop {
                    let n = match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => n,
                    };
                    request.extend_from_slice(&buf[..n]);
                    if request_complete(&request) {
                        break;
                    }
                }

                let response = format!(
                    "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{}", addr)
}

/// Accept connections and never answer, and return the base URL.
#[allow(dead_code)]
pub async fn serve_hanging() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    format!("http://{}", addr)
}

#[allow(dead_code)]
fn request_complete(request: &[u8]) -> bool {
    let Some(header_end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };
    let headers = String::from_utf8_lossy(&request[..header_end]).to_ascii_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    request.len() >= header_end + 4 + content_length
}
