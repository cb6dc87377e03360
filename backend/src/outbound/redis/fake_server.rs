//! Minimal RESP server for exercising the Redis adapters without Redis.
//!
//! Understands `LPUSH`, `EXPIRE` and `LRANGE`; every other command is
//! answered with `+OK`, which covers the client's connection setup.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use redis::Client;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

#[derive(Default)]
struct Shared {
    lists: Mutex<HashMap<String, VecDeque<String>>>,
    expiries: Mutex<HashMap<String, i64>>,
    reject_expire: AtomicBool,
    open_connections: AtomicUsize,
}

impl Shared {
    fn reply(&self, args: &[String]) -> String {
        let name = args
            .first()
            .map(|name| name.to_ascii_uppercase())
            .unwrap_or_default();
        match (name.as_str(), args) {
            ("LPUSH", [_, key, values @ ..]) => {
                let mut lists = self.lists.lock().expect("lists lock");
                let list = lists.entry(key.clone()).or_default();
                for value in values {
                    list.push_front(value.clone());
                }
                format!(":{}\r\n", list.len())
            }
            ("EXPIRE", [_, key, seconds]) => {
                if self.reject_expire.load(Ordering::SeqCst) {
                    return "-ERR expire rejected\r\n".to_owned();
                }
                let exists = self.lists.lock().expect("lists lock").contains_key(key);
                if exists {
                    self.expiries
                        .lock()
                        .expect("expiries lock")
                        .insert(key.clone(), seconds.parse().unwrap_or_default());
                }
                format!(":{}\r\n", i32::from(exists))
            }
            ("LRANGE", [_, key, ..]) => {
                let items = self
                    .lists
                    .lock()
                    .expect("lists lock")
                    .get(key)
                    .map(|list| list.iter().cloned().collect::<Vec<_>>())
                    .unwrap_or_default();
                let mut out = format!("*{}\r\n", items.len());
                for item in items {
                    out.push_str(&format!("${}\r\n{item}\r\n", item.len()));
                }
                out
            }
            _ => "+OK\r\n".to_owned(),
        }
    }
}

/// In-process stand-in for a Redis server on a loopback port.
pub(crate) struct FakeRedis {
    addr: SocketAddr,
    shared: Arc<Shared>,
    disconnect: Arc<watch::Sender<u64>>,
}

impl FakeRedis {
    pub(crate) async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake redis");
        let addr = listener.local_addr().expect("fake redis address");
        let shared = Arc::new(Shared::default());
        let (disconnect, _) = watch::channel(0_u64);
        let disconnect = Arc::new(disconnect);

        let accept_shared = Arc::clone(&shared);
        let accept_disconnect = Arc::clone(&disconnect);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(
                    stream,
                    Arc::clone(&accept_shared),
                    accept_disconnect.subscribe(),
                ));
            }
        });

        Self {
            addr,
            shared,
            disconnect,
        }
    }

    pub(crate) fn client(&self) -> Client {
        Client::open(format!("redis://{}/", self.addr)).expect("fake redis client")
    }

    /// Stored list for `key`, newest first.
    pub(crate) fn list(&self, key: &str) -> Vec<String> {
        self.shared
            .lists
            .lock()
            .expect("lists lock")
            .get(key)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn expiry(&self, key: &str) -> Option<i64> {
        self.shared
            .expiries
            .lock()
            .expect("expiries lock")
            .get(key)
            .copied()
    }

    /// Answer every later `EXPIRE` with an error reply.
    pub(crate) fn reject_expire(&self) {
        self.shared.reject_expire.store(true, Ordering::SeqCst);
    }

    /// Close every open client socket and wait until they are gone.
    pub(crate) async fn drop_connections(&self) {
        self.disconnect.send_modify(|round| *round += 1);
        tokio::time::timeout(Duration::from_secs(1), async {
            while self.shared.open_connections.load(Ordering::SeqCst) > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("client sockets close");
    }
}

struct OpenGuard(Arc<Shared>);

impl Drop for OpenGuard {
    fn drop(&mut self) {
        self.0.open_connections.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn serve(mut stream: TcpStream, shared: Arc<Shared>, mut disconnect: watch::Receiver<u64>) {
    shared.open_connections.fetch_add(1, Ordering::SeqCst);
    let _open = OpenGuard(Arc::clone(&shared));
    let mut pending = Vec::new();
    let mut chunk = [0_u8; 1024];
    loop {
        let read = tokio::select! {
            read = stream.read(&mut chunk) => read,
            _ = disconnect.changed() => return,
        };
        let n = match read {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        pending.extend_from_slice(&chunk[..n]);
        while let Some((args, used)) = parse_command(&pending) {
            pending.drain(..used);
            if stream
                .write_all(shared.reply(&args).as_bytes())
                .await
                .is_err()
            {
                return;
            }
        }
    }
}

/// Parse one RESP array of bulk strings, returning it with the bytes used.
fn parse_command(buf: &[u8]) -> Option<(Vec<String>, usize)> {
    let (count, mut pos) = read_header(buf, 0, b'*')?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        let (len, start) = read_header(buf, pos, b'$')?;
        let end = start + len;
        let value = buf.get(start..end)?;
        if buf.len() < end + 2 {
            return None;
        }
        args.push(String::from_utf8_lossy(value).into_owned());
        pos = end + 2;
    }
    Some((args, pos))
}

fn read_header(buf: &[u8], pos: usize, marker: u8) -> Option<(usize, usize)> {
    let rest = buf.get(pos..)?;
    if *rest.first()? != marker {
        return None;
    }
    let line_end = rest.windows(2).position(|pair| pair == b"\r\n")?;
    let value = std::str::from_utf8(rest.get(1..line_end)?)
        .ok()?
        .parse()
        .ok()?;
    Some((value, pos + line_end + 2))
}
