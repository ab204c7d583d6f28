// Integration test for the libp2p ADS-B path
//
// A seller node dials a buyer node over loopback TCP, opens an ADS-B stream
// and writes frames; the buyer's ingest sessions decode them and apply the
// override registered for the seller's key.

use libp2p::identity::{secp256k1, Keypair};
use sensorlink_core::transport::{self, NodeEvent};
use sensorlink_core::wire::write_observation;
use sensorlink_core::{
    LocationOverrides, SensorLocation, SensorObservation, SessionConfig,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

fn frame(sensor_id: i64) -> SensorObservation {
    SensorObservation {
        sensor_id,
        latitude: 10.0,
        longitude: 20.0,
        altitude: 30.0,
        seconds_since_midnight: 3_600,
        nanoseconds: sensor_id as u64,
        raw_payload: vec![0x8D, 0x40, 0x62, 0x1D, 0x58, 0xC3, 0x82, 0xD6, 0x90, 0xC8, 0xAC, 0x28, 0x63, 0xA7],
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_seller_frames_reach_buyer_sessions() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let seller_keys = secp256k1::Keypair::generate();
    let seller_public_hex = hex::encode(seller_keys.public().to_bytes());
    let seller_identity = Keypair::from(seller_keys);

    // Buyer
    let (buyer_event_tx, mut buyer_event_rx) = mpsc::channel(64);
    let buyer = transport::start_node(
        Keypair::generate_secp256k1(),
        Some("/ip4/127.0.0.1/tcp/0".parse().unwrap()),
        buyer_event_tx,
    )
    .await
    .expect("Failed to start buyer node");

    let overrides = Arc::new(LocationOverrides::from_public_keys([(
        seller_public_hex.as_str(),
        SensorLocation::new(50.0, -5.0, 100.0),
    )]));
    assert_eq!(overrides.len(), 1);

    let (record_tx, mut record_rx) = mpsc::channel(16);
    let _ingest = transport::spawn_ingest(&buyer, overrides, record_tx, SessionConfig::default())
        .expect("Failed to register ADS-B protocol");

    let listen_addr = timeout(Duration::from_secs(10), async {
        loop {
            if let Some(NodeEvent::ListeningOn(addr)) = buyer_event_rx.recv().await {
                return addr;
            }
        }
    })
    .await
    .expect("Buyer never reported a listen address");

    // Keep draining buyer events so the swarm task never blocks on them
    tokio::spawn(async move { while buyer_event_rx.recv().await.is_some() {} });

    // Seller
    let (seller_event_tx, mut seller_event_rx) = mpsc::channel(64);
    let seller = transport::start_node(seller_identity, None, seller_event_tx)
        .await
        .expect("Failed to start seller node");
    tokio::spawn(async move { while seller_event_rx.recv().await.is_some() {} });

    let buyer_addr = listen_addr.with(libp2p::multiaddr::Protocol::P2p(buyer.local_peer_id()));
    let mut stream = timeout(Duration::from_secs(10), transport::open_feed(&seller, buyer_addr))
        .await
        .expect("Timed out opening feed")
        .expect("Failed to open feed");

    for sensor_id in 1..=3 {
        write_observation(&mut stream, &frame(sensor_id))
            .await
            .expect("Failed to write frame");
    }

    for sensor_id in 1..=3 {
        let event = timeout(Duration::from_secs(10), record_rx.recv())
            .await
            .expect("Timed out waiting for record")
            .expect("Record channel closed");

        assert_eq!(event.peer_id, seller.local_peer_id());
        assert!(event.location_overridden);
        assert_eq!(event.observation.sensor_id, sensor_id);
        assert_eq!(event.observation.location(), SensorLocation::new(50.0, -5.0, 100.0));
        assert_eq!(event.observation.raw_payload, frame(sensor_id).raw_payload);
    }

    seller.shutdown().await.ok();
    buyer.shutdown().await.ok();
}
