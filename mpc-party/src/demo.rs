use mpc_substrate::bootstrap::Protocol;
use mpc_substrate::channel::Channel;
use mpc_substrate::errors::MpcError;
use mpc_substrate::field::FieldVector;
use mpc_substrate::network::Network;

/// Length of each party's secret input vector.
pub const INPUT_LENGTH: usize = 8;

/// Computes the sum of every party's private input vector.
///
/// Each party splits its input into additive shares, one per party, and hands
/// one share to each peer. Parties add up the shares they hold and reveal
/// those partial sums, which add up to the total. A second round reveals the
/// inputs themselves so every party can check the total it reconstructed.
#[derive(Debug, Clone)]
pub struct SumOfInputs {
    length: usize,
}

impl SumOfInputs {
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    fn share_input<C: Channel>(
        &self,
        network: &mut Network<C>,
        input: &FieldVector,
    ) -> Result<FieldVector, MpcError> {
        let mut rng = rand::rng();
        let mut kept = input.clone();
        for peer in network.peers() {
            let share = FieldVector::random(self.length, &mut rng);
            kept.sub_assign(&share)?;
            network.send_vector(&share, peer)?;
        }
        for peer in network.peers() {
            let share: FieldVector = network.receive_vector(peer)?;
            kept.add_assign(&share)?;
        }
        Ok(kept)
    }

    /// Sends `value` to every peer and returns the sum of it and all values received.
    fn reveal<C: Channel>(
        &self,
        network: &mut Network<C>,
        value: &FieldVector,
    ) -> Result<FieldVector, MpcError> {
        for peer in network.peers() {
            network.send_vector(value, peer)?;
        }
        let mut sum = value.clone();
        for peer in network.peers() {
            let other: FieldVector = network.receive_vector(peer)?;
            sum.add_assign(&other)?;
        }
        Ok(sum)
    }
}

impl<C: Channel> Protocol<C> for SumOfInputs {
    fn run(&mut self, network: &mut Network<C>, pid: usize) -> Result<bool, MpcError> {
        let input = FieldVector::random(self.length, &mut rand::rng());

        let partial = self.share_input(network, &input)?;
        let total = self.reveal(network, &partial)?;
        log::debug!("[P{}] reconstructed total {}", pid, total);

        let expected = self.reveal(network, &input)?;
        total.equals(&expected)
    }
}
