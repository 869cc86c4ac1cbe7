use std::time::Duration;

use log::{error, info};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use vesc_uart::{VescConfig, VescConnection, VescError};

fn main() -> Result<(), VescError> {
    TermLogger::init(
        LevelFilter::Debug,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .expect("logger should only be initialized once");

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/dev/ttyUSB0".to_string());

    let mut vesc = VescConnection::open(&path, VescConfig::default())?;

    let controllers = vesc.scan_for_controllers().unwrap_or_else(|e| {
        error!("CAN scan failed: {}", e);
        Vec::new()
    });
    info!("Found {} controllers on CAN", controllers.len());

    for target in std::iter::once(None).chain(controllers.into_iter().map(Some)) {
        match vesc.request_telemetry(target) {
            Ok(values) => {
                match target {
                    Some(id) => println!("--- {id} ---"),
                    None => println!("--- local ---"),
                }
                println!("{values}");
            }
            Err(e) => error!("Telemetry request failed: {}", e),
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    Ok(())
}
