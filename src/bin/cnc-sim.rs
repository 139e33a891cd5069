//! Axis simulator binary: an independent MQTT consumer that subscribes to
//! the controller's setpoint stream, integrates three linked [`Axis`]
//! plants against it, and publishes back position and tracking error while
//! logging one CSV row per cycle.

use clap::Parser;
use cnc_core::axis::Axis;
use cnc_core::cli::SimArgs;
use cnc_core::machine::config::Config;
use cnc_core::point::Point;
use serde::Deserialize;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct SetpointMsg {
    x: f64,
    y: f64,
    z: f64,
    #[allow(dead_code)]
    rapid: bool,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

fn status_base_topic(sub_topic: &str) -> String {
    sub_topic
        .strip_suffix("/#")
        .unwrap_or(sub_topic)
        .to_string()
}

fn main() {
    init_logging();
    let args = SimArgs::parse();

    let config = match Config::load(&args.ini_file) {
        Ok(c) => c,
        Err(err) => {
            tracing::error!(%err, "failed to load configuration");
            std::process::exit(1);
        }
    };

    let mut log_sink: Box<dyn Write> = match &args.log_file {
        Some(path) => match std::fs::File::create(path) {
            Ok(f) => Box::new(f),
            Err(err) => {
                tracing::error!(%err, path = %path.display(), "could not create log file");
                std::process::exit(1);
            }
        },
        None => Box::new(std::io::stdout()),
    };
    let _ = writeln!(log_sink, "t,x,y,z,err_x,err_y,err_z");

    let mut x = Axis::new("X", config.axes.x.clone());
    let mut y = Axis::new("Y", config.axes.y.clone());
    let mut z = Axis::new("Z", config.axes.z.clone());
    x.link(&y);
    x.link(&z);
    y.link(&z);
    x.run(config.machine.cycle_time());
    y.run(config.machine.cycle_time());
    z.run(config.machine.cycle_time());

    let stop_requested = Arc::new(AtomicBool::new(false));
    if let Err(err) =
        signal_hook::flag::register(signal_hook::consts::SIGINT, stop_requested.clone())
    {
        tracing::warn!(%err, "could not install SIGINT handler");
    }

    let status_base = status_base_topic(&config.mqtt.sub_topic);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("building the tokio runtime");

    let mut options = rumqttc::MqttOptions::new(
        "cnc-sim",
        config.mqtt.broker_address.clone(),
        config.mqtt.broker_port,
    );
    options.set_keep_alive(Duration::from_secs(5));
    let (client, mut eventloop) = rumqttc::AsyncClient::new(options, 64);

    runtime.block_on(async {
        if let Err(err) = client
            .subscribe(&config.mqtt.pub_topic, rumqttc::QoS::AtMostOnce)
            .await
        {
            tracing::error!(%err, "could not subscribe to the setpoint topic");
            std::process::exit(1);
        }
    });

    let cycle = Duration::from_secs_f64(config.machine.cycle_time().max(1e-3));
    let mut t = 0.0_f64;

    runtime.block_on(async {
        let mut ticker = tokio::time::interval(cycle);
        loop {
            if stop_requested.load(Ordering::SeqCst) {
                break;
            }
            tokio::select! {
                event = eventloop.poll() => {
                    if let Ok(rumqttc::Event::Incoming(rumqttc::Packet::Publish(p))) = event {
                        if let Ok(msg) = serde_json::from_slice::<SetpointMsg>(&p.payload) {
                            x.set_target(msg.x);
                            y.set_target(msg.y);
                            z.set_target(msg.z);
                        }
                    }
                }
                _ = ticker.tick() => {
                    let mut position = Point::zero();
                    position.set_xyz(x.position(), y.position(), z.position());
                    let err = x.target_error().hypot(y.target_error()).hypot(z.target_error());

                    let _ = writeln!(
                        log_sink,
                        "{:.3},{:.4},{:.4},{:.4},{:.5},{:.5},{:.5}",
                        t, position.x(), position.y(), position.z(),
                        x.target_error(), y.target_error(), z.target_error(),
                    );

                    let _ = client
                        .publish(
                            format!("{status_base}/position"),
                            rumqttc::QoS::AtMostOnce,
                            false,
                            format!("{:.4},{:.4},{:.4}", position.x(), position.y(), position.z()),
                        )
                        .await;
                    let _ = client
                        .publish(
                            format!("{status_base}/error"),
                            rumqttc::QoS::AtMostOnce,
                            false,
                            format!("{err:.5}"),
                        )
                        .await;
                    t += cycle.as_secs_f64();
                }
            }
        }
    });

    x.stop(Duration::from_secs(1));
    y.stop(Duration::from_secs(1));
    z.stop(Duration::from_secs(1));
}
