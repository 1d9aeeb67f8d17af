//! Test-traffic sender: bursts of instrumented UDP packets.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::net::{lookup_host, UdpSocket};

use echostats_core::{encode_header, now_millis};

use crate::cli::SendArgs;
use crate::error::{EchoError, Result};

/// Build one framed packet padded to `packet_len` with random digits.
///
/// If the header alone is longer than `packet_len`, the packet is just the
/// header.
pub fn build_packet<R: Rng>(
    rng: &mut R,
    nonce: &str,
    packet_num: u64,
    total: u64,
    packet_len: usize,
) -> Vec<u8> {
    let mut packet = encode_header(nonce, packet_num, total).into_bytes();
    let body_len = packet_len.saturating_sub(packet.len());
    packet.extend((0..body_len).map(|_| b'0' + rng.gen_range(0..10u8)));
    packet
}

/// Nonce for a sender run that did not name one.
pub fn default_nonce() -> String {
    format!("cmdline-exp-{}", now_millis())
}

/// Send `repeats` passes of `packets` numbered datagrams to the target.
///
/// Returns the nonce used and the number of datagrams sent. Replies are not
/// awaited.
pub async fn send(args: &SendArgs) -> Result<(String, u64)> {
    let target: SocketAddr = lookup_host(args.target.as_str())
        .await?
        .next()
        .ok_or_else(|| EchoError::Config(format!("cannot resolve {}", args.target)))?;

    let local = if target.is_ipv4() {
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    } else {
        IpAddr::V6(Ipv6Addr::UNSPECIFIED)
    };
    let socket = UdpSocket::bind(SocketAddr::new(local, 0)).await?;

    let nonce = args.nonce.clone().unwrap_or_else(default_nonce);
    let mut rng = StdRng::from_entropy();
    let mut sent = 0u64;

    for _ in 0..args.repeats {
        for packet_num in 0..args.packets {
            let packet = build_packet(&mut rng, &nonce, packet_num, args.packets, args.packet_len);
            socket.send_to(&packet, target).await?;
            sent += 1;
        }
    }

    tracing::info!(%target, %nonce, sent, "sent test traffic");
    Ok((nonce, sent))
}
