use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use product_model::RetrievalResult;
use recommend_service::{init_logging, write_greeting, EmbedderChoice, ServiceConfig, ServiceError, Session};
use tracing::warn;

fn print_usage() {
    eprintln!(
        "Usage:\n\
         recommend-cli [--catalog PATH] [--k N] [--embedder onnx|hashing|none] [--json] [QUERY...]\n\
         \n\
         With a QUERY the top product is printed once; without one, queries are read from stdin line by line.\n\
         Other settings come from RECOMMEND_* environment variables (a .env file is loaded when present).\n"
    );
}

struct Args {
    catalog: Option<PathBuf>,
    k: Option<usize>,
    embedder: Option<EmbedderChoice>,
    json: bool,
    query: Vec<String>,
}

fn parse_args(args: Vec<String>) -> Result<Args, String> {
    let mut out = Args { catalog: None, k: None, embedder: None, json: false, query: Vec::new() };
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--catalog" => out.catalog = Some(PathBuf::from(it.next().ok_or("--catalog requires path")?)),
            "--k" => {
                let v = it.next().ok_or("--k requires number")?;
                out.k = Some(v.parse().ok().filter(|k: &usize| *k > 0).ok_or(format!("--k expects a positive number, got `{v}`"))?);
            }
            "--embedder" => {
                let v = it.next().ok_or("--embedder requires onnx|hashing|none")?;
                out.embedder = Some(v.parse().map_err(|_| format!("unknown embedder `{v}`"))?);
            }
            "--json" => out.json = true,
            "-h" | "--help" => return Err(String::new()),
            _ => out.query.push(arg),
        }
    }
    Ok(out)
}

fn answer(session: &mut Session, query: &str, json: bool, out: &mut dyn Write) -> Result<(), ServiceError> {
    let result = session.ask(query)?;
    if json {
        let _entered = session.span().enter();
        print_json(session, query, &result, out);
        return Ok(());
    }
    session.display(out, &result)?;
    Ok(())
}

fn print_json(session: &Session, query: &str, result: &RetrievalResult, out: &mut dyn Write) {
    let value = serde_json::json!({
        "session_id": session.id().as_str(),
        "query": query,
        "result": result,
    });
    if let Err(e) = writeln!(out, "{value}") { warn!(error = %e, "failed to write json result"); }
}

fn main() -> ExitCode {
    let args = match parse_args(env::args().skip(1).collect()) {
        Ok(a) => a,
        Err(msg) => {
            if !msg.is_empty() { eprintln!("Error: {msg}"); }
            print_usage();
            return ExitCode::from(2);
        }
    };

    let mut cfg = match ServiceConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(2);
        }
    };
    if let Some(path) = args.catalog { cfg.catalog_path = path; }
    if let Some(k) = args.k { cfg.top_k = k; }
    if let Some(choice) = args.embedder { cfg.embedder = choice; }

    if let Err(e) = init_logging(&cfg.log) { eprintln!("warning: file logging disabled: {e}"); }

    let mut session = Session::new(cfg);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if !args.query.is_empty() {
        let query = args.query.join(" ");
        return match answer(&mut session, &query, args.json, &mut out) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{}", e.user_message());
                ExitCode::FAILURE
            }
        };
    }

    if !args.json {
        let _ = write_greeting(&mut out);
        let _ = out.flush();
    }
    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error: failed to read stdin: {e}");
                return ExitCode::FAILURE;
            }
        };
        let query = line.trim();
        if query.is_empty() { continue; }
        if let Err(e) = answer(&mut session, query, args.json, &mut out) {
            eprintln!("{}", e.user_message());
            // no documents to search; later queries cannot succeed either
            if matches!(e, ServiceError::EmptyCatalog { .. }) { return ExitCode::FAILURE; }
        }
    }
    ExitCode::SUCCESS
}
