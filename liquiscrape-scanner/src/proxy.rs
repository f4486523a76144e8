use crate::USER_AGENT;
use crate::error::{Result, ScanError};
use rand::seq::SliceRandom;
use reqwest::{Client, Proxy, StatusCode};
use scraper::{Html, Selector};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const DEFAULT_LISTING_URL: &str = "https://free-proxy-list.net/";
pub const DEFAULT_TARGET_URL: &str = "https://liquipedia.net/";

/// Ports tried against every host found in the listing.
pub const COMMON_PROXY_PORTS: [u16; 4] = [3128, 3124, 80, 8080];
pub const MAX_LISTING_ROWS: usize = 299;
pub const DEFAULT_PROBE_CONCURRENCY: usize = 256;
pub const DEFAULT_MIN_LIVE: usize = 10;

static ROW_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tbody tr").expect("valid row selector"));
static CELL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("valid cell selector"));

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyAddress {
    pub host: String,
    pub port: u16,
}

impl ProxyAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ProxyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for ProxyAddress {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        let (host, port) = s
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| ScanError::InvalidUrl(format!("expected host:port, got '{}'", s)))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| ScanError::InvalidUrl(format!("invalid proxy port in '{}'", s)))?;
        if host.is_empty() {
            return Err(ScanError::InvalidUrl(format!("missing proxy host in '{}'", s)));
        }
        Ok(Self::new(host, port))
    }
}

/// A proxy that answered the liveness probe, with a client routed through it.
#[derive(Debug, Clone)]
pub struct LiveProxy {
    address: ProxyAddress,
    client: Client,
}

impl LiveProxy {
    pub fn address(&self) -> &ProxyAddress {
        &self.address
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// The live proxies handed to fetch workers. Read-only once built.
#[derive(Debug, Clone)]
pub struct ProxySet {
    proxies: Arc<[LiveProxy]>,
}

impl ProxySet {
    pub fn new(proxies: Vec<LiveProxy>) -> Self {
        Self {
            proxies: proxies.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Builds clients for known addresses without probing them.
    pub fn from_addresses(addresses: &[ProxyAddress]) -> Result<Self> {
        let mut proxies = Vec::with_capacity(addresses.len());
        let mut seen = HashSet::new();
        for address in addresses {
            if seen.insert(address.clone()) {
                proxies.push(LiveProxy {
                    address: address.clone(),
                    client: build_proxy_client(address)?,
                });
            }
        }
        Ok(Self::new(proxies))
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Picks a proxy uniformly at random.
    pub fn choose(&self) -> Option<LiveProxy> {
        self.proxies.choose(&mut rand::thread_rng()).cloned()
    }

    pub fn addresses(&self) -> Vec<ProxyAddress> {
        self.proxies.iter().map(|p| p.address.clone()).collect()
    }
}

/// When discovery is allowed to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationPolicy {
    /// Keep running discovery rounds until this many proxies are live.
    UntilMinimum(usize),
    /// Stop after the first completed validation pass, whatever its yield.
    SinglePass,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        ValidationPolicy::UntilMinimum(DEFAULT_MIN_LIVE)
    }
}

/// Scrapes a public proxy listing and keeps the entries that can reach the
/// target site.
pub struct ProxyPool {
    listing_client: Client,
    listing_url: String,
    target_url: String,
    ports: Vec<u16>,
    max_listing_rows: usize,
    probe_concurrency: usize,
    probe_timeout: Duration,
    policy: ValidationPolicy,
    max_rounds: Option<u32>,
    round_delay: Duration,
}

impl ProxyPool {
    pub fn new(listing_url: impl Into<String>, target_url: impl Into<String>) -> Result<Self> {
        let listing_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            listing_client,
            listing_url: listing_url.into(),
            target_url: target_url.into(),
            ports: COMMON_PROXY_PORTS.to_vec(),
            max_listing_rows: MAX_LISTING_ROWS,
            probe_concurrency: DEFAULT_PROBE_CONCURRENCY,
            probe_timeout: Duration::from_secs(10),
            policy: ValidationPolicy::default(),
            max_rounds: None,
            round_delay: Duration::from_secs(2),
        })
    }

    pub fn with_ports(mut self, ports: Vec<u16>) -> Self {
        self.ports = ports;
        self
    }

    pub fn with_max_listing_rows(mut self, rows: usize) -> Self {
        self.max_listing_rows = rows;
        self
    }

    pub fn with_probe_concurrency(mut self, concurrency: usize) -> Self {
        self.probe_concurrency = concurrency.max(1);
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_policy(mut self, policy: ValidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: Option<u32>) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_round_delay(mut self, delay: Duration) -> Self {
        self.round_delay = delay;
        self
    }

    /// Runs discovery rounds until the validation policy is satisfied.
    ///
    /// A round fetches a fresh listing and probes every candidate that is not
    /// already live. Rounds whose listing cannot be fetched or has no rows do
    /// not count as a validation pass.
    pub async fn discover_and_validate(&self) -> Result<ProxySet> {
        info!("Fetching proxies from {}", self.listing_url);

        let mut live: Vec<LiveProxy> = Vec::new();
        let mut live_addresses: HashSet<ProxyAddress> = HashSet::new();
        let mut round = 0u32;

        loop {
            if let Some(max_rounds) = self.max_rounds
                && round >= max_rounds
            {
                return Err(ScanError::ProxyDiscoveryFailed(format!(
                    "{} live proxies after {} rounds",
                    live.len(),
                    round
                )));
            }
            if round > 0 && !self.round_delay.is_zero() {
                tokio::time::sleep(self.round_delay).await;
            }
            round += 1;

            let candidates = match self.fetch_candidates().await {
                Ok(candidates) if !candidates.is_empty() => candidates,
                Ok(_) => {
                    warn!("Proxy listing had no rows (round {}), fetching again", round);
                    continue;
                }
                Err(e) => {
                    warn!("Could not fetch proxy listing (round {}): {}", round, e);
                    continue;
                }
            };

            let fresh: Vec<ProxyAddress> = candidates
                .into_iter()
                .filter(|c| !live_addresses.contains(c))
                .collect();
            info!("Filtering {} candidate proxies", fresh.len());

            for proxy in self.validate(fresh).await? {
                if live_addresses.insert(proxy.address.clone()) {
                    live.push(proxy);
                }
            }
            info!("Working proxies: {} after round {}", live.len(), round);

            match self.policy {
                ValidationPolicy::SinglePass => break,
                ValidationPolicy::UntilMinimum(min) if live.len() >= min => break,
                ValidationPolicy::UntilMinimum(min) => {
                    debug!("Need {} live proxies, have {}", min, live.len());
                }
            }
        }

        Ok(ProxySet::new(live))
    }

    pub async fn fetch_candidates(&self) -> Result<Vec<ProxyAddress>> {
        let response = self.listing_client.get(&self.listing_url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(ScanError::UnexpectedStatus {
                url: self.listing_url.clone(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        Ok(parse_listing(&body, &self.ports, self.max_listing_rows))
    }

    /// Probes candidates with a fixed number of workers draining one queue.
    pub async fn validate(&self, candidates: Vec<ProxyAddress>) -> Result<Vec<LiveProxy>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let workers = self.probe_concurrency.clamp(1, candidates.len());
        let queue = Arc::new(Mutex::new(VecDeque::from(candidates)));
        let live: Arc<Mutex<Vec<LiveProxy>>> = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let queue = queue.clone();
            let live = live.clone();
            let target_url = self.target_url.clone();
            let timeout = self.probe_timeout;

            handles.push(tokio::spawn(async move {
                loop {
                    let candidate = queue.lock().await.pop_front();
                    let Some(candidate) = candidate else {
                        break;
                    };

                    match probe(&candidate, &target_url, timeout).await {
                        Ok(proxy) => {
                            let mut live = live.lock().await;
                            live.push(proxy);
                            debug!("Proxies found: {}", live.len());
                        }
                        Err(e) => debug!("Proxy {} rejected: {}", candidate, e),
                    }
                }
                debug!("Probe worker {} finished", worker_id);
            }));
        }

        for handle in handles {
            handle.await?;
        }

        let live = std::mem::take(&mut *live.lock().await);
        Ok(live)
    }
}

/// Reads `host` from the first cell of each listing row and pairs it with
/// every port.
pub fn parse_listing(html: &str, ports: &[u16], max_rows: usize) -> Vec<ProxyAddress> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for row in document.select(&ROW_SELECTOR).take(max_rows) {
        let Some(cell) = row.select(&CELL_SELECTOR).next() else {
            continue;
        };
        let host = cell.text().collect::<String>().trim().to_string();
        if host.is_empty() {
            continue;
        }
        for &port in ports {
            let candidate = ProxyAddress::new(host.clone(), port);
            if seen.insert(candidate.clone()) {
                candidates.push(candidate);
            }
        }
    }

    candidates
}

/// Client that routes every request through `address`. Certificates are not
/// verified: free proxies routinely intercept TLS.
pub fn build_proxy_client(address: &ProxyAddress) -> Result<Client> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .proxy(Proxy::all(address.endpoint())?)
        .danger_accept_invalid_certs(true)
        .pool_max_idle_per_host(4)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()?;
    Ok(client)
}

async fn probe(address: &ProxyAddress, target_url: &str, timeout: Duration) -> Result<LiveProxy> {
    let client = build_proxy_client(address)?;
    let response = client.get(target_url).timeout(timeout).send().await?;
    let status = response.status();
    if status != StatusCode::OK {
        return Err(ScanError::UnexpectedStatus {
            url: target_url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(LiveProxy {
        address: address.clone(),
        client,
    })
}
