use bazaar_derive::bazaar_error;

#[bazaar_error]
pub enum QueueError {
    #[error("Queue is closed")]
    Closed {},
}

fn main() {
    let _ = QueueError::Closed {}.to_string();
}
