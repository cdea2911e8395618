use std::net::{Ipv4Addr, Ipv6Addr};

use traceanon_engines::{
    AnonKey, I64Anonymizer, Ipv4Anonymizer, Ipv6Anonymizer, MacAddr, MacAnonymizer,
    OctetStringAnonymizer, U64Anonymizer,
};

fn test_key() -> AnonKey {
    AnonKey::from_passphrase("test")
}

#[test]
fn ipv4_prefix_scenario() {
    let mut engine = Ipv4Anonymizer::new();
    engine.set_key(&test_key());

    let out1 = engine.map_pref(Ipv4Addr::new(10, 0, 0, 1));
    let out2 = engine.map_pref(Ipv4Addr::new(10, 0, 0, 2));
    let out3 = engine.map_pref(Ipv4Addr::new(11, 0, 0, 1));

    // 10.0.0.1 and 10.0.0.2 share 30 bits; their outputs must agree on the
    // first three octets.
    assert_eq!(out1.octets()[..3], out2.octets()[..3]);
    assert_ne!(out1, out2);

    // 10.x and 11.x diverge at bit 7, so the outputs differ already in the
    // first octet.
    assert_ne!(out1.octets()[0], out3.octets()[0]);
    let shared = (u32::from(Ipv4Addr::new(10, 0, 0, 1)) ^ u32::from(Ipv4Addr::new(11, 0, 0, 1)))
        .leading_zeros();
    assert_eq!(
        (u32::from(out1) ^ u32::from(out3)).leading_zeros(),
        shared
    );
}

#[test]
fn ipv4_lex_scenario() {
    let mut engine = Ipv4Anonymizer::new();
    engine.set_key(&test_key());

    let inputs = [
        Ipv4Addr::new(1, 2, 3, 4),
        Ipv4Addr::new(1, 2, 3, 5),
        Ipv4Addr::new(5, 6, 7, 8),
    ];
    for &addr in &inputs {
        engine.set_used(addr, 32);
    }
    let outs: Vec<u32> = inputs
        .iter()
        .map(|&a| u32::from(engine.map_pref_lex(a)))
        .collect();

    assert!(outs[0] < outs[1]);
    assert!(outs[1] < outs[2]);
    // The first two inputs share a 30-bit prefix; so must their outputs.
    assert_eq!(outs[0] >> 2, outs[1] >> 2);
}

#[test]
fn ipv6_prefix_and_lex() {
    let mut engine = Ipv6Anonymizer::new();
    engine.set_key(&test_key());

    let inputs: Vec<Ipv6Addr> = ["2001:db8::1", "2001:db8::2", "fe80::1"]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();
    for &addr in &inputs {
        engine.set_used(addr, 128);
    }
    let outs: Vec<u128> = inputs
        .iter()
        .map(|&a| u128::from(engine.map_pref_lex(a)))
        .collect();

    assert!(outs[0] < outs[1]);
    assert!(outs[1] < outs[2]);
    let shared = (u128::from(inputs[0]) ^ u128::from(inputs[1])).leading_zeros();
    assert_eq!((outs[0] ^ outs[1]).leading_zeros(), shared);
}

#[test]
fn mac_scenario() {
    let mut engine = MacAnonymizer::new();
    engine.set_key(&test_key());

    let x: MacAddr = "01:23:45:67:89:ab".parse().unwrap();
    let y: MacAddr = "01:23:45:67:89:ac".parse().unwrap();
    let out_x = engine.map(x);
    let out_y = engine.map(y);

    // The 01: first octet has I/G set and U/L clear; both must survive.
    assert!(out_x.is_group() && !out_x.is_local());
    assert!(out_y.is_group() && !out_y.is_local());
    assert_ne!(out_x, out_y);
}

#[test]
fn uint64_range_scenario() {
    let mut engine = U64Anonymizer::new(100, 199);
    engine.set_key(&test_key());

    engine.set_used(5);
    engine.set_used(42);

    let a = engine.map_lex(5);
    let b = engine.map_lex(42);
    assert!((100..=199).contains(&a));
    assert!((100..=199).contains(&b));
    assert!(a < b);
}

#[test]
#[should_panic(expected = "not marked")]
fn uint64_unmarked_input_is_a_programmer_error() {
    let mut engine = U64Anonymizer::new(100, 199);
    engine.set_key(&test_key());
    engine.set_used(5);
    engine.set_used(42);
    engine.map_lex(5);
    engine.map_lex(1000);
}

#[test]
fn octet_string_lex_scenario() {
    let mut engine = OctetStringAnonymizer::new();
    engine.set_key(&test_key());

    let inputs: [&[u8]; 3] = [b"aaa", b"aab", b"zzz"];
    for input in inputs {
        engine.set_used(input);
    }
    let outs: Vec<Vec<u8>> = inputs.iter().map(|i| engine.map_lex(i)).collect();

    for out in &outs {
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(u8::is_ascii_lowercase));
    }
    assert!(outs[0] < outs[1]);
    assert!(outs[1] < outs[2]);
}

#[test]
fn same_passphrase_reproduces_every_engine() {
    let drive = |key: &AnonKey| -> Vec<String> {
        let mut results = Vec::new();

        let mut v4 = Ipv4Anonymizer::new();
        v4.set_key(key);
        results.push(v4.map_pref(Ipv4Addr::new(203, 0, 113, 9)).to_string());

        let mut v6 = Ipv6Anonymizer::new();
        v6.set_key(key);
        let addr: Ipv6Addr = "2001:db8::42".parse().unwrap();
        results.push(v6.map_pref(addr).to_string());

        let mut mac = MacAnonymizer::new();
        mac.set_key(key);
        let hw: MacAddr = "02:42:ac:11:00:02".parse().unwrap();
        results.push(mac.map(hw).to_string());

        let mut ints = U64Anonymizer::new(0, u64::MAX);
        ints.set_key(key);
        results.push(ints.map(4711).to_string());

        let mut signed = I64Anonymizer::new(-1000, 1000);
        signed.set_key(key);
        results.push(signed.map(-17).to_string());

        let mut octs = OctetStringAnonymizer::new();
        octs.set_key(key);
        results.push(String::from_utf8(octs.map(b"flow-1234")).unwrap());

        results
    };

    let first = drive(&AnonKey::from_passphrase("shared secret"));
    let second = drive(&AnonKey::from_passphrase("shared secret"));
    assert_eq!(first, second);

    let other = drive(&AnonKey::from_passphrase("different secret"));
    assert_ne!(first, other);
}

#[test]
fn distinct_engines_do_not_interfere() {
    let key = test_key();
    let mut lone = Ipv4Anonymizer::new();
    lone.set_key(&key);
    let expected = lone.map_pref(Ipv4Addr::new(192, 0, 2, 55));

    // An engine that has seen other traffic first still maps the address to
    // the same output: the map depends only on the key, not on history.
    let mut busy = Ipv4Anonymizer::new();
    busy.set_key(&key);
    busy.map_pref(Ipv4Addr::new(198, 51, 100, 1));
    busy.map_pref(Ipv4Addr::new(10, 11, 12, 13));
    assert_eq!(busy.map_pref(Ipv4Addr::new(192, 0, 2, 55)), expected);
}
