use busdec_codec::CaptureCodec;
use busdec_protocol::{create_decoder, Decoder, DecoderConfig, ProtocolDecoder};
use clap::Parser;
use color_eyre::eyre::{bail, Context, Result};
use futures_util::{SinkExt, StreamExt};
use std::path::PathBuf;
use tokio::io::AsyncRead;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(about = "Decode captured bus frames and print the results as JSON lines")]
struct Args {
    #[arg(long, default_value = "info")]
    log_level: Level,

    /// Protocol to decode: modbus, i2c, spi or can
    #[arg(short, long, conflicts_with = "config")]
    kind: Option<String>,

    /// Protocol settings as a JSON object, e.g. '{"extended": true}'
    #[arg(short, long, requires = "kind")]
    settings: Option<String>,

    /// JSON file holding a complete decoder configuration
    #[arg(short, long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Capture file with one hex encoded frame per line (defaults to stdin)
    #[arg(short, long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    input: Option<PathBuf>,

    /// Print the decoder description and exit
    #[arg(long)]
    describe: bool,
}

fn load_config(args: &Args) -> Result<DecoderConfig> {
    if let Some(path) = &args.config {
        debug!("Loading decoder configuration from {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        return serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse {}", path.display()));
    }

    let Some(kind) = &args.kind else {
        bail!("Either --kind or --config must be given");
    };
    let mut config = DecoderConfig::new(kind.as_str());
    if let Some(settings) = &args.settings {
        config.settings =
            serde_json::from_str(settings).with_context(|| "Failed to parse --settings")?;
    }
    Ok(config)
}

async fn open_input(path: Option<&PathBuf>) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(tokio::io::stdin())),
    }
}

async fn run<R>(decoder: &ProtocolDecoder, input: R) -> Result<(usize, usize)>
where
    R: AsyncRead + Unpin,
{
    let mut frames = FramedRead::new(input, CaptureCodec::new());
    let mut output = FramedWrite::new(tokio::io::stdout(), CaptureCodec::new());
    let (mut total, mut invalid) = (0, 0);

    while let Some(frame) = frames.next().await {
        let frame = frame.with_context(|| "Failed reading capture")?;
        let result = decoder.decode(&frame);

        total += 1;
        if !result.valid {
            invalid += 1;
        }
        debug!("{} frame {}: {:?}", decoder.protocol(), total, result);

        output.send(result).await?;
    }

    Ok((total, invalid))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(args.log_level)
            .with_writer(std::io::stderr)
            .finish(),
    )?;

    let config = load_config(&args)?;
    let decoder = create_decoder(config).with_context(|| "Failed to create decoder")?;

    if args.describe {
        println!("{}", decoder.describe());
        return Ok(());
    }

    info!("Decoding with {}", decoder.describe());

    let input = open_input(args.input.as_ref()).await?;
    let (total, invalid) = run(&decoder, input).await?;

    info!("Decoded {} frames ({} invalid)", total, invalid);

    Ok(())
}
