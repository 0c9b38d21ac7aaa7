use std::path::PathBuf;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use vireo::{Builder, SiteConfig};
use vireo::markdown::SyntaxHighlight;

mod publish;
mod serve;

xflags::xflags! {
    /// Builds a documentation site from a YAML config.
    cmd finch {
        /// Path to the site config. Defaults to `config.yml`.
        optional -c, --config path: PathBuf
        /// Directory to write the site into. Defaults to `_site`.
        optional -o, --output path: PathBuf
        /// Rebuild whenever a source file changes.
        optional -w, --watch
        /// Serve the output directory over HTTP.
        optional -s, --serve
        /// Port to serve on. Defaults to 3000.
        optional -p, --port port: u16
        /// Prefix internal URLs with the configured base URL and push
        /// the output to the `gh-pages` branch after every build.
        optional --publish
        /// Enable debug logging.
        optional -d, --debug
    }
}

fn main() -> ExitCode {
    let flags = Finch::from_env_or_exit();

    let default = match flags.debug {
        true => "debug",
        false => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default)))
        .init();

    match run(flags) {
        Ok(()) => ExitCode::SUCCESS,
        // A bare message is an expected user-facing stop; anything with
        // an underlying cause gets the full chain for visibility.
        Err(e) if !e.has_cause() => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(flags: Finch) -> vireo::Result<()> {
    let config_path = flags.config.unwrap_or_else(|| PathBuf::from("config.yml"));
    let output = flags.output.unwrap_or_else(|| PathBuf::from("_site"));
    let port = flags.port.unwrap_or(3000);

    SyntaxHighlight::warm_up();

    let builder = Builder::new(output.clone(), flags.publish);
    let build = || -> vireo::Result<SiteConfig> {
        let config = SiteConfig::load(&config_path)?;
        builder.build(&config)?;
        if flags.publish {
            publish::publish(&builder.output)?;
        }

        Ok(config)
    };

    // The first build is fatal on failure; rebuilds during watch are
    // reported and watching continues.
    let config = build()?;

    if flags.serve {
        serve::serve(output, port)?;
    }

    if flags.watch {
        vireo::watch::watch(config.watch_set(), || Ok(build()?.watch_set()))?;
    } else if flags.serve {
        loop {
            std::thread::park();
        }
    }

    Ok(())
}
