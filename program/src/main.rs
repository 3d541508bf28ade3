#![no_main]
sp1_zkvm::entrypoint!(main);

use product_passport_lib::{evaluate, PublicInputs, Witness};

pub fn main() {
    // Private inputs first, then the public ones they are checked against
    let witness = sp1_zkvm::io::read::<Witness>();
    let public = sp1_zkvm::io::read::<PublicInputs>();

    // Failed checks fold into `valid = false`; outputs are always committed
    let evaluation = evaluate(&witness, &public);

    let bytes = evaluation.outputs.abi_encode();
    sp1_zkvm::io::commit_slice(&bytes);
}
