use std::io::Write;

use clap::Parser;

use utopia_compass::compass::Locale;
use utopia_compass::config::{self, Config, DESTINATION};
use utopia_compass::sensors::gps::NmeaGps;
use utopia_compass::sensors::magnetometer::MagnetometerSource;
use utopia_compass::sensors::simulated::{SimulatedCompass, SimulatedWalk};
use utopia_compass::sensors::{OrientationSource, PositionOptions, PositionSource};
use utopia_compass::{CompassSession, RenderModel, SessionOptions};

/// Compass needle pointing at Utopia.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (default: utopia-compass.toml, then /etc)
    #[arg(short, long)]
    config: Option<String>,

    /// Walk toward the destination with simulated sensors instead of hardware
    #[arg(short, long)]
    simulate: bool,

    /// Label language, overrides the config file
    #[arg(short, long, value_enum)]
    locale: Option<Locale>,

    /// GPS serial device, overrides the config file
    #[arg(short, long)]
    gps: Option<String>,
}

type Sources = (Box<dyn PositionSource>, Box<dyn OrientationSource>);

fn hardware_sources(config: &Config) -> Sources {
    log::info!("  GPS: {}", config.gps.device);
    let position: Box<dyn PositionSource> = Box::new(NmeaGps::new(&config.gps.device));
    let orientation: Box<dyn OrientationSource> =
        Box::new(MagnetometerSource::probe(&config.magnetometer));
    (position, orientation)
}

fn simulated_sources(config: &Config) -> Sources {
    log::info!(
        "  Simulation: {} at {} km/h (x{})",
        config.simulation_start(),
        config.simulation.speed_kmh,
        config.simulation.time_scale
    );
    let position: Box<dyn PositionSource> =
        Box::new(SimulatedWalk::from_config(&config.simulation));
    let orientation: Box<dyn OrientationSource> =
        Box::new(SimulatedCompass::from_config(&config.simulation));
    (position, orientation)
}

fn render(model: &RenderModel, locale: Locale) {
    let prompt = match (model.show_permission_prompt, locale) {
        (false, _) => "",
        (true, Locale::De) => "  [Kompass aktivieren]",
        (true, Locale::En) => "  [Enable compass]",
    };
    print!(
        "\r{:>5.1}°  {:>5.1}°  {:>10}  {:>8}  {}{}\x1b[K",
        model.smoothed_needle_rotation_deg,
        model.smoothed_device_heading_deg,
        model.distance_label,
        model.bearing_label,
        model.status_label,
        prompt
    );
    std::io::stdout().flush().ok();
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = Args::parse();
    let mut config = config::load_config(args.config.as_deref());
    if let Some(locale) = args.locale {
        config.locale = locale;
    }
    if let Some(device) = args.gps {
        config.gps.device = device;
    }

    log::info!("utopia-compass starting");
    log::info!("  Destination: {}", DESTINATION);

    let (position, orientation) = if args.simulate {
        simulated_sources(&config)
    } else {
        hardware_sources(&config)
    };

    let options = SessionOptions {
        locale: config.locale,
        position: PositionOptions {
            high_accuracy: config.gps.high_accuracy,
            timeout: config.gps_timeout(),
            allow_cached_fix: false,
        },
        ..Default::default()
    };
    let mut session = CompassSession::mount(Some(position), Some(orientation), options);

    // No touch screen here; a simulated gate is accepted right away.
    if args.simulate && session.render_model().show_permission_prompt {
        log::info!("Accepting compass permission prompt");
        session.on_permission_prompt_accepted();
    }

    let render_every = u64::from(config.display.render_every.max(1));
    session.run(config.frame_interval(), |session| {
        if session.frames() % render_every == 0 {
            render(&session.render_model(), config.locale);
        }
        let arrived = args.simulate && session.last_fix() == Some(DESTINATION);
        if arrived {
            println!();
            log::info!("Arrived at {}", DESTINATION);
        }
        !arrived
    });

    session.unmount();
}
