//! Live OpenTripPlanner tests.
//!
//! Needs docker and a built OTP 1.x graph directory in `OTP_GRAPH_DIR`
//! (containing `default/Graph.obj` for Sydney). Skipped when unset.

mod fixtures;

use std::env;
use std::time::{Duration, Instant};

use chrono::Local;
use testcontainers::core::{IntoContainerPort, Mount, WaitFor};
use testcontainers::runners::SyncRunner;
use testcontainers::{Container, GenericImage, ImageExt, ReuseDirective, TestcontainersError};

use transport_analyst::otp::{OtpClient, OtpConfig};
use transport_analyst::traits::{RouteProvider, ServiceAreaProvider};
use transport_analyst::{RouteRequest, TravelMode};

use fixtures::{DESTINATIONS, HUBS};

fn otp_container(graph_dir: &str) -> Result<(Container<GenericImage>, String), TestcontainersError> {
    let image = GenericImage::new("opentripplanner/opentripplanner", "1.5.0")
        .with_exposed_port(8080.tcp())
        .with_wait_for(WaitFor::message_on_stdout("Grizzly server running"))
        .with_mount(Mount::bind_mount(graph_dir.to_string(), "/var/otp/graphs"))
        .with_cmd(vec![
            "--server",
            "--graphs",
            "/var/otp/graphs",
            "--router",
            "default",
            "--analyst",
        ])
        .with_container_name("otp-sydney")
        .with_startup_timeout(Duration::from_secs(300))
        .with_reuse(ReuseDirective::Always);

    let container = image.start()?;
    let port = container.get_host_port_ipv4(8080.tcp())?;
    let base_url = format!("http://127.0.0.1:{}/otp/routers/default", port);

    Ok((container, base_url))
}

#[test]
fn otp_routes_and_isochrones_in_sydney() {
    let Ok(graph_dir) = env::var("OTP_GRAPH_DIR") else {
        eprintln!("OTP_GRAPH_DIR not set; skipping live OpenTripPlanner test");
        return;
    };
    let (container, base_url) = otp_container(&graph_dir).expect("start OTP container");

    let client = OtpClient::new(OtpConfig {
        base_url,
        timeout_secs: 60,
    })
    .expect("build OTP client");

    let request = RouteRequest::new(
        HUBS[0].location(),
        DESTINATIONS[1].location(),
        TravelMode::Walk,
    )
    .departure(Local::now().naive_local())
    .trip_name("central to opera house");

    let rows = {
        let start = Instant::now();
        let mut last = Vec::new();
        while start.elapsed() < Duration::from_secs(30) {
            match client.route(&request) {
                Ok(rows) if !rows.is_empty() => {
                    last = rows;
                    break;
                }
                Ok(_) => {}
                Err(err) => eprintln!("OTP plan error: {}", err),
            }
            std::thread::sleep(Duration::from_millis(500));
        }
        last
    };
    if rows.is_empty() {
        if let Ok(stderr) = container.stderr_to_vec() {
            eprintln!("OTP stderr:\n{}", String::from_utf8_lossy(&stderr));
        }
    }
    assert!(!rows.is_empty(), "expected a walking route");
    assert!(rows.iter().all(|row| row.trip_name == "central to opera house"));
    assert!(rows.iter().map(|row| row.distance.unwrap_or_default()).sum::<f64>() > 1000.0);

    let isochrones = client
        .isochrones(
            HUBS[0].location().coords(),
            TravelMode::Walk,
            &[10, 20],
            Local::now().naive_local(),
        )
        .expect("isochrone request");
    assert!(!isochrones.is_empty());

    drop(container);
}
