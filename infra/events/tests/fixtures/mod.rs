use bazaar_event_bus::Topic;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bid(pub usize);

pub struct BidPlaced;

impl Topic for BidPlaced {
    type Payload = Bid;
    const NAME: &'static str = "bid-placed";
}

pub struct BidWithdrawn;

impl Topic for BidWithdrawn {
    type Payload = Bid;
    const NAME: &'static str = "bid-withdrawn";
}
