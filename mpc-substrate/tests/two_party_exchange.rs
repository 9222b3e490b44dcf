use mpc_substrate::channel::{Channel, ChannelState, SocketChannel};
use mpc_substrate::errors::MpcError;
use mpc_substrate::field::Fp;

use std::thread;
use std::time::Duration;

type F97 = Fp<97>;

fn prefix(name: &str) -> String {
    std::env::temp_dir()
        .join(format!("mpc-it-{}-{}", name, std::process::id()))
        .to_string_lossy()
        .into_owned()
}

#[test]
fn field_element_crosses_a_socket() -> Result<(), MpcError> {
    let prefix = prefix("exchange");
    let port = 41;
    let payload = F97::new(42).to_bytes();
    let width = payload.len();
    assert_eq!(width, 1);

    let listener_prefix = prefix.clone();
    let a = thread::spawn(move || -> Result<(u64, ChannelState), MpcError> {
        let mut channel = SocketChannel::new(0, listener_prefix);
        channel.open();
        channel.bind(port)?;
        channel.listen()?;
        channel.accept()?;
        channel.send(&payload)?;
        channel.close();
        Ok((channel.stats().bytes_sent, channel.state()))
    });

    let mut b = SocketChannel::new(1, prefix);
    b.open();
    let address = b.address(port);
    let mut attempts = 0;
    while let Err(err) = b.connect(&address) {
        attempts += 1;
        if !err.is_recoverable() || attempts > 400 {
            return Err(err);
        }
        thread::sleep(Duration::from_millis(5));
    }

    let received = F97::from_bytes(&b.receive(width)?);
    assert_eq!(received, F97::new(42));
    assert_eq!(received.add(&F97::new(60)), F97::new(5));
    b.close();

    let (sent, state) = a
        .join()
        .map_err(|_| MpcError::InvalidState("listener panicked".to_string()))??;
    assert_eq!(sent, width as u64);
    assert_eq!(state, ChannelState::Closed);
    assert_eq!(b.state(), ChannelState::Closed);
    assert_eq!(b.stats().bytes_received, width as u64);
    Ok(())
}
