use clap::Parser;
use lora_decoders::{init_logger, DecoderRegistry, UplinkMeta};

#[derive(Parser)]
#[command(name = "lora-decode")]
#[command(about = "Decode LoRaWAN sensor payloads to JSON")]
struct Cli {
    /// Device type (cmi4110, door-sensor, motion-sensor, button-panel,
    /// electricity-meter)
    #[arg(short, long)]
    device: String,

    /// Payload as a hex string
    payload: String,

    /// LoRaWAN frame port
    #[arg(short, long)]
    f_port: Option<u8>,
}

fn main() {
    init_logger();

    let cli = Cli::parse();
    let payload = match hex::decode(cli.payload.trim()) {
        Ok(payload) => payload,
        Err(err) => {
            eprintln!("Invalid hex payload: {err}");
            std::process::exit(1);
        }
    };

    let registry = DecoderRegistry::with_defaults();
    let readings = registry.decode_uplink(&cli.device, &payload, &UplinkMeta { f_port: cli.f_port });

    for reading in &readings {
        match serde_json::to_string_pretty(reading) {
            Ok(json) => println!("{json}"),
            Err(err) => eprintln!("Failed to serialize reading: {err}"),
        }
    }
}
