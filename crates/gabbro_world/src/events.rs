use std::sync::mpsc;

use glam::IVec3;

use gabbro_shared::block::BlockId;

/// Side effects the core announces to UI/audio collaborators. Delivery is
/// synchronous and best-effort: a dropped receiver never fails the world.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WorldEvent {
    BlockBroken { pos: IVec3, block: BlockId },
    BlockPlaced { pos: IVec3, block: BlockId },
    WaterSettled { pos: IVec3 },
}

pub struct EventSender<T> {
    tx: mpsc::Sender<T>,
}

pub struct EventReceiver<T> {
    rx: mpsc::Receiver<T>,
}

pub fn channel<T>() -> (EventSender<T>, EventReceiver<T>) {
    let (tx, rx) = mpsc::channel();
    (EventSender { tx }, EventReceiver { rx })
}

impl<T> Clone for EventSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> EventSender<T> {
    pub fn send(&self, event: T) -> Result<(), mpsc::SendError<T>> {
        self.tx.send(event)
    }
}

impl<T> EventReceiver<T> {
    pub fn try_recv(&self) -> Result<T, mpsc::TryRecvError> {
        self.rx.try_recv()
    }

    pub fn drain(&self) -> Vec<T> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}
