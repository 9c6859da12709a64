use fedround_network::{PeerAddr, PeerDirectory, TransportError};

#[test]
fn test_add_and_resolve() {
    let mut dir = PeerDirectory::new();
    dir.add("1", PeerAddr::new("127.0.0.1", 50052));
    assert_eq!(dir.resolve("1").unwrap(), PeerAddr::new("127.0.0.1", 50052));
    assert_eq!(dir.len(), 1);
}

#[test]
fn test_resolve_unknown_fails() {
    let dir = PeerDirectory::new();
    let err = dir.resolve("99").unwrap_err();
    assert!(matches!(err, TransportError::UnknownPeer(id) if id == "99"));
}

#[test]
fn test_add_is_idempotent_upsert() {
    let mut dir = PeerDirectory::new();
    dir.add("1", PeerAddr::new("127.0.0.1", 50052));
    dir.add("1", PeerAddr::new("127.0.0.1", 50053));
    assert_eq!(dir.len(), 1);
    assert_eq!(dir.resolve("1").unwrap().port, 50053);
}

#[test]
fn test_resolve_all() {
    let mut dir = PeerDirectory::new();
    dir.add("1", PeerAddr::new("10.0.0.1", 1));
    dir.add("2", PeerAddr::new("10.0.0.2", 2));
    let mut all = dir.resolve_all();
    all.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].0, "1");
    assert_eq!(all[1].1.host, "10.0.0.2");
}

#[test]
fn test_peer_addr_parse() {
    let addr: PeerAddr = "localhost:50051".parse().unwrap();
    assert_eq!(addr.host, "localhost");
    assert_eq!(addr.port, 50051);
    assert_eq!(addr.to_string(), "localhost:50051");

    assert!("no-port".parse::<PeerAddr>().is_err());
    assert!("host:notaport".parse::<PeerAddr>().is_err());
}
