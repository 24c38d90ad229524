use anyhow::Result;
use esp32_rc_remote_lib::{
    commands::PERMISSIONS_REQUIRED_MESSAGE,
    config::AppConfig,
    logging::SessionLogger,
    AppState, Command, ScanPress,
};
use log::{error, info};
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
commands:
  scan              start or stop scanning
  list              show discovered devices
  connect <n|id>    connect to a listed device
  disconnect        drop the connection
  <F|B|L|R|G|I|H|J> hold a direction
  release           let go of the held direction (sends S)
  stop              tap the stop button
  status            show the session state
  quit";

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load_config().await.unwrap_or_else(|e| {
        eprintln!("Failed to load config, using default: {}", e);
        AppConfig::default()
    });

    if SessionLogger::init(&config.logging).is_err() {
        // Only fall back to env_logger when our logger could not be installed
        env_logger::builder().filter_level(config.logging.level_filter()).init();
    }

    let app_state = AppState::new(config);
    let session = app_state.get_session_arc();
    let surface = &app_state.control_surface;

    let mut events = session.events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => println!("<{}> {}", event.name(), json),
                Err(e) => error!("Failed to serialize event: {}", e),
            }
        }
    });

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            continue;
        };

        match word.to_lowercase().as_str() {
            "scan" => match surface.handle_scan_press().await {
                ScanPress::PermissionsRequired => println!("{}", PERMISSIONS_REQUIRED_MESSAGE),
                ScanPress::Started => println!("Scanning..."),
                ScanPress::Stopped => println!("Scan stopped"),
            },
            "list" => {
                let devices = session.devices();
                if devices.is_empty() {
                    println!("No devices found");
                }
                for (index, device) in devices.iter().enumerate() {
                    println!("{:>2}. {} [{}]", index, device.display_name(), device.id);
                }
            }
            "connect" => {
                let Some(target) = words.next() else {
                    println!("usage: connect <n|id>");
                    continue;
                };
                let device_id = match target.parse::<usize>() {
                    Ok(index) => match session.devices().get(index) {
                        Some(device) => device.id.to_string(),
                        None => {
                            println!("No device at index {}", index);
                            continue;
                        }
                    },
                    Err(_) => target.to_string(),
                };
                match surface.handle_device_connect(&device_id).await {
                    Ok(()) => println!("Connected. Hold a direction, release to stop."),
                    Err(message) => println!("Connection Failed: {}", message),
                }
            }
            "disconnect" => surface.handle_disconnect().await,
            "release" => {
                surface.handle_release().await;
            }
            "stop" => {
                surface.handle_stop_tap().await;
            }
            "status" => println!("{}", serde_json::to_string_pretty(&session.state())?),
            "quit" | "exit" => break,
            "help" => println!("{}", HELP),
            other => match other.parse::<Command>() {
                Ok(command) => {
                    surface.handle_press(command).await;
                }
                Err(e) => println!("{}", e),
            },
        }
    }

    info!("Exiting");
    if session.is_connected().await {
        surface.handle_release().await;
    }
    session.shutdown().await;
    Ok(())
}
