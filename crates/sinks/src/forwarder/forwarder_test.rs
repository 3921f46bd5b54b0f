use super::*;
use conduit_protocol::{BytesMut, EnvelopeBatch, FrameDecoder};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

/// Accept one connection and decode `frames` frames from it
async fn receive_frames(listener: TcpListener, frames: usize) -> Vec<EnvelopeBatch> {
    let (mut socket, _) = listener.accept().await.expect("failed to accept");
    let decoder = FrameDecoder::new();
    let mut buf = BytesMut::with_capacity(4096);
    let mut batches = Vec::new();

    while batches.len() < frames {
        if let Some(batch) = decoder.decode(&mut buf).expect("bad frame") {
            batches.push(batch);
            continue;
        }
        let n = socket.read_buf(&mut buf).await.expect("failed to read");
        assert!(n > 0, "connection closed early");
    }
    batches
}

fn binding_for(addr: std::net::SocketAddr) -> Binding {
    Binding::new("app", "host", format!("tcp://{}", addr))
}

// =============================================================================
// Config tests
// =============================================================================

#[test]
fn test_config_defaults() {
    let config = ForwarderConfig::default();

    assert_eq!(config.connection_timeout, Duration::from_secs(5));
    assert_eq!(config.write_timeout, Duration::from_secs(5));
    assert!(config.tcp_keepalive);
    assert_eq!(config.max_frame_size, MAX_FRAME_SIZE);
}

#[test]
fn test_config_builders() {
    let config = ForwarderConfig::default()
        .with_connection_timeout(Duration::from_secs(30))
        .with_write_timeout(Duration::from_secs(10))
        .with_tcp_keepalive(false)
        .with_tcp_keepalive_interval(Duration::from_secs(1))
        .with_max_frame_size(4096);

    assert_eq!(config.connection_timeout, Duration::from_secs(30));
    assert_eq!(config.write_timeout, Duration::from_secs(10));
    assert!(!config.tcp_keepalive);
    assert_eq!(config.tcp_keepalive_interval, Duration::from_secs(1));
    assert_eq!(config.max_frame_size, 4096);

    let capped = ForwarderConfig::default().with_max_frame_size(usize::MAX);
    assert_eq!(capped.max_frame_size, MAX_FRAME_SIZE);
}

// =============================================================================
// Connection tests
// =============================================================================

#[tokio::test]
async fn test_sends_one_frame_per_batch() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(receive_frames(listener, 2));

    let connector = TcpConnector::default();
    let mut connection = connector.connect(&binding_for(addr)).await.unwrap();

    let first = vec![
        Arc::new(Envelope::log("src", "one").with_timestamp(1)),
        Arc::new(Envelope::counter("src", "hits", 20).with_timestamp(2)),
    ];
    let second = vec![Arc::new(Envelope::log("src", "two").with_timestamp(3))];
    assert_eq!(connection.send(&first).await.unwrap(), 2);
    assert_eq!(connection.send(&second).await.unwrap(), 1);

    let batches = server.await.unwrap();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].batch.len(), 2);
    assert_eq!(batches[0].batch[0], *first[0]);
    assert_eq!(batches[0].batch[1], *first[1]);
    assert_eq!(batches[1].batch, vec![(*second[0]).clone()]);
}

#[tokio::test]
async fn test_connection_refused() {
    // Bind then drop to get a port nothing listens on
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let err = TcpConnector::default()
        .open(&binding_for(addr))
        .await
        .unwrap_err();

    assert!(matches!(err, ForwarderError::ConnectionFailed { .. }));
    assert!(matches!(
        PipelineError::from(err),
        PipelineError::Connect { .. }
    ));
}

#[tokio::test]
async fn test_invalid_drain() {
    let binding = Binding::new("app", "host", "tcp://missing-port");

    let err = TcpConnector::default().open(&binding).await.unwrap_err();
    assert!(matches!(err, ForwarderError::InvalidDrain(_)));
}

#[tokio::test]
async fn test_write_to_closed_peer_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        drop(socket);
    });

    let mut connection = TcpConnector::default()
        .open(&binding_for(addr))
        .await
        .unwrap();
    server.await.unwrap();

    let batch = vec![Arc::new(Envelope::log("src", vec![0u8; 64 * 1024]))];
    let mut failed = false;
    for _ in 0..50 {
        if connection.send_batch(&batch).await.is_err() {
            failed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(failed, "writes to a closed peer should eventually fail");
}

fn sized_log(i: i64, bytes: usize) -> Arc<Envelope> {
    Arc::new(Envelope::log("src", vec![b'x'; bytes]).with_timestamp(i + 1))
}

#[tokio::test]
async fn test_large_batch_is_split_across_frames() {
    let max = 8 * 1024;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Each envelope fits in a frame; all twenty together do not
    let batch: Vec<Arc<Envelope>> = (0..20).map(|i| sized_log(i, 1024)).collect();
    let whole = conduit_protocol::encode_frame(&batch).unwrap();
    assert!(whole.len() > max);

    let expected_frames = encode_frames(&batch, max).frames.len();
    assert!(expected_frames > 1);
    let server = tokio::spawn(receive_frames(listener, expected_frames + 1));

    let config = ForwarderConfig::default().with_max_frame_size(max);
    let mut connection = TcpConnector::new(config)
        .open(&binding_for(addr))
        .await
        .unwrap();
    assert_eq!(connection.send_batch(&batch).await.unwrap(), 20);

    // Connection is still usable
    let after = vec![sized_log(20, 8)];
    assert_eq!(connection.send_batch(&after).await.unwrap(), 1);

    let batches = server.await.unwrap();
    let timestamps: Vec<i64> = batches
        .iter()
        .flat_map(|b| b.batch.iter().map(|e| e.timestamp))
        .collect();
    assert_eq!(timestamps, (1..=21).collect::<Vec<i64>>());
}

#[tokio::test]
async fn test_envelope_larger_than_frame_is_skipped() {
    let max = 4096;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(receive_frames(listener, 2));

    let config = ForwarderConfig::default().with_max_frame_size(max);
    let mut connection = TcpConnector::new(config)
        .open(&binding_for(addr))
        .await
        .unwrap();

    let batch = vec![sized_log(0, 16), sized_log(1, 4096), sized_log(2, 16)];
    assert_eq!(connection.send(&batch).await.unwrap(), 2);

    let only_oversized = vec![sized_log(3, 4096)];
    assert_eq!(connection.send(&only_oversized).await.unwrap(), 0);

    let after = vec![sized_log(4, 16)];
    assert_eq!(connection.send(&after).await.unwrap(), 1);

    let batches = server.await.unwrap();
    let timestamps: Vec<Vec<i64>> = batches
        .iter()
        .map(|b| b.batch.iter().map(|e| e.timestamp).collect())
        .collect();
    assert_eq!(timestamps, vec![vec![1, 3], vec![5]]);
}

#[test]
fn test_connector_name() {
    assert_eq!(TcpConnector::default().name(), "forwarder");
}
