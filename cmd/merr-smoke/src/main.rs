//! merr smoke test
//!
//! Exercises the packed error code end to end:
//!   Part A: encode (merr!, merr_io!, merr_ensure!) and decode
//!   Part B: formatting into fixed buffers, two-phase retry
//!   Part C: success, EBUG, domain and corrupted codes
//!
//! Run: ./target/release/merr-smoke [0xCODE ...]
//! Each hex argument is decoded and printed after the tests.
//! MERR_SMOKE_BUF sets the first-pass buffer size (default 256).
//! MERR_SMOKE_LOG overrides MERR_LOG_LEVEL for the run.

use merr::env::{env_get, env_get_str, env_is_set};
use merr::kprint::{log_level, set_flush_enabled};
use merr::{kerror, kinfo, kprintln, kwarn, merr, merr_ensure, merr_io, set_log_level};
use merr::{FileTable, LogLevel, Merr, MerrResult, EBUG};

// ── Test harness ──

struct TestRunner {
    total: usize,
    passed: usize,
    failed: usize,
}

const LINE: &str = "────────────────────────────────────────────────────────────";

impl TestRunner {
    fn new() -> Self {
        Self { total: 0, passed: 0, failed: 0 }
    }

    fn section(&self, name: &str) {
        println!("\n{}", LINE);
        println!("  {}", name);
        println!("{}", LINE);
    }

    fn pass(&mut self, name: &str) {
        self.total += 1;
        self.passed += 1;
        println!("  [{:2}] {:<52} PASS", self.total, name);
    }

    fn fail(&mut self, name: &str, reason: &str) {
        self.total += 1;
        self.failed += 1;
        println!("  [{:2}] {:<52} FAIL: {}", self.total, name, reason);
    }

    fn check(&mut self, name: &str, ok: bool, reason: &str) {
        if ok { self.pass(name); } else { self.fail(name, reason); }
    }

    fn summary(&self) {
        println!("\n{}", LINE);
        println!(
            "  Total: {}  Passed: {}  Failed: {}",
            self.total, self.passed, self.failed
        );
        println!("{}", LINE);
    }
}

/// Format `err` with a first pass of `first` bytes, retrying once with the
/// reported size if that was not enough.
fn format_two_phase(err: Merr, first: usize) -> (String, usize, bool) {
    let mut buf = vec![0u8; first];
    let info = err.strinfo(&mut buf);
    if !info.truncated() {
        return (info.as_str().to_owned(), info.need(), false);
    }
    let need = info.need();
    let mut buf = vec![0u8; need];
    let info = err.strinfo(&mut buf);
    (info.as_str().to_owned(), need, true)
}

// ════════════════════════════════════════════════════════════
// Part A: Encode / decode
// ════════════════════════════════════════════════════════════

fn reserve(len: usize) -> MerrResult<usize> {
    merr_ensure!(len <= 4096, libc::EMSGSIZE);
    Ok(len)
}

fn test_encode(t: &mut TestRunner) {
    t.section("Part A: Encode / decode");

    let (e, line) = (merr!(libc::ENOSPC), line!());
    t.check("merr!(ENOSPC) is located", e.is_located(), "reserved bit clear");
    t.check("errno round-trips", e.errno() == libc::ENOSPC, &format!("{}", e.errno()));
    t.check("line round-trips", e.lineno() == line, &format!("{} != {}", e.lineno(), line));
    t.check(
        "file resolves to this source",
        e.file().map_or(false, |f| f.ends_with("main.rs")),
        &format!("{:?}", e.file()),
    );

    let neg = merr!(-libc::EIO);
    t.check("negative errno stored as magnitude", neg.errno() == libc::EIO, "sign kept");

    t.check("merr!(0) is success", merr!(0).is_ok(), "non-zero code");

    let io_err = std::io::Error::from_raw_os_error(libc::EACCES);
    let e = merr_io!(io_err);
    t.check("merr_io! keeps os errno", e.errno() == libc::EACCES, &format!("{}", e.errno()));

    t.check("merr_ensure! passes", reserve(128) == Ok(128), "unexpected error");
    match reserve(1 << 20) {
        Err(e) => t.check(
            "merr_ensure! fails with EMSGSIZE",
            e.errno() == libc::EMSGSIZE,
            &format!("{:?}", e),
        ),
        Ok(_) => t.fail("merr_ensure! fails with EMSGSIZE", "returned Ok"),
    }

    let anon = Merr::pack(libc::EPERM, None, 7);
    t.check("anonymous code has no file", anon.file().is_none(), "file resolved");
}

// ════════════════════════════════════════════════════════════
// Part B: Buffers
// ════════════════════════════════════════════════════════════

fn test_buffers(t: &mut TestRunner, first: usize) {
    t.section(&format!("Part B: Formatting (first pass {} bytes)", first));

    let e = merr!(libc::ENOENT);
    let full = e.to_string();
    t.check(
        "Display ends with strerror",
        full.ends_with(&merr::strerror(libc::ENOENT)),
        &full,
    );

    let (msg, need, retried) = format_two_phase(e, first);
    println!("       {} (need {}, retried {})", msg, need, retried);
    t.check("two-phase result matches Display", msg == full, &msg);
    t.check("need is length + 1", need == full.len() + 1, &format!("{}", need));

    for sz in [0usize, 1, 8, 24] {
        let mut buf = vec![0xffu8; sz];
        let info = e.strinfo(&mut buf);
        let need = info.need();
        let text_len = info.as_str().len();
        let terminated = sz == 0 || buf.contains(&0);
        t.check(
            &format!("{:2}-byte buffer stays terminated", sz),
            terminated && need >= text_len + 1,
            &format!("need {}", need),
        );
    }
}

// ════════════════════════════════════════════════════════════
// Part C: Special codes
// ════════════════════════════════════════════════════════════

fn test_special(t: &mut TestRunner) {
    t.section("Part C: Special codes");

    let mut buf = [0u8; 64];
    let info = Merr::SUCCESS.strinfo(&mut buf);
    t.check("success", info.as_str() == "success" && info.need() == 8, info.as_str());

    let s = merr!(EBUG).to_string();
    t.check("EBUG is a software bug", s.ends_with("HSE software bug"), &s);

    let domain = Merr::from_raw(0x1234);
    let s = domain.to_string();
    t.check("domain code uses domain formatter", s == "domain error 0x1234", &s);

    let s = Merr::NO_LOCATION.to_string();
    t.check("all-ones code does not panic", !s.is_empty(), &s);
}

fn decode_args(args: &[String]) {
    if args.is_empty() {
        return;
    }
    // Parse errors go to stderr; keep them in order with stdout.
    set_flush_enabled(true);
    println!("\n{}", LINE);
    for a in args {
        let digits = a.trim_start_matches("0x").trim_start_matches("0X");
        match u64::from_str_radix(digits, 16) {
            Ok(raw) => {
                let e = Merr::from_raw(raw);
                println!("  {:#018x}  {:?}", raw, e);
                println!("  {:>18}  {}", "", e);
            }
            Err(err) => kprintln!("  {}: {}", a, err),
        }
    }
}

fn main() {
    println!("=== merr Smoke Test ===");

    let level = env_get_str("MERR_SMOKE_LOG", log_level().as_str());
    match level.parse::<LogLevel>() {
        Ok(l) => set_log_level(l),
        Err(()) => kwarn!("MERR_SMOKE_LOG={} not a level, keeping default", level),
    }

    if let Err(e) = merr::files::install(FileTable::new([file!()]).unwrap_or_default()) {
        kerror!("file table install failed: {}", e);
        std::process::exit(1);
    }
    let first: usize = env_get("MERR_SMOKE_BUF", 256);
    if env_is_set("MERR_SMOKE_BUF") {
        println!("    first-pass buffer: {} bytes (MERR_SMOKE_BUF)", first);
    }
    kinfo!("first-pass buffer {} bytes", first);

    let mut t = TestRunner::new();

    test_encode(&mut t);
    test_buffers(&mut t, first);
    test_special(&mut t);

    t.summary();

    let args: Vec<String> = std::env::args().skip(1).collect();
    decode_args(&args);

    std::process::exit(if t.failed > 0 { 1 } else { 0 });
}
