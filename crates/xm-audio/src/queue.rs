//! Lock-free handoff of voice commands from the sequencer thread to the
//! audio callback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use xm_engine::{VoiceCommand, VoiceSink};

use crate::mixer::Mixer;

type Entry = (u8, VoiceCommand);

/// Create a single-producer/single-consumer command queue holding up to
/// `capacity` commands.
pub fn command_queue(capacity: usize) -> (CommandSender, CommandReceiver) {
    let (producer, consumer) = HeapRb::<Entry>::new(capacity.max(1)).split();
    let dropped = Arc::new(AtomicU64::new(0));
    (
        CommandSender {
            producer,
            dropped: dropped.clone(),
        },
        CommandReceiver { consumer, dropped },
    )
}

/// Sequencer side. Never blocks: commands that do not fit are dropped and
/// counted.
pub struct CommandSender {
    producer: HeapProd<Entry>,
    dropped: Arc<AtomicU64>,
}

impl CommandSender {
    /// Commands dropped since the last call.
    pub fn take_dropped(&self) -> u64 {
        self.dropped.swap(0, Ordering::Relaxed)
    }

    pub fn free_len(&self) -> usize {
        self.producer.vacant_len()
    }
}

impl VoiceSink for CommandSender {
    fn dispatch(&mut self, voice: u8, command: VoiceCommand) {
        if self.producer.try_push((voice, command)).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Audio side.
pub struct CommandReceiver {
    consumer: HeapCons<Entry>,
    dropped: Arc<AtomicU64>,
}

impl CommandReceiver {
    /// Apply every queued command to `mixer`. Returns how many were applied.
    pub fn drain_into(&mut self, mixer: &mut Mixer) -> usize {
        let mut count = 0;
        while let Some((voice, command)) = self.consumer.try_pop() {
            mixer.apply(voice, command);
            count += 1;
        }
        count
    }

    pub fn pending(&self) -> usize {
        self.consumer.occupied_len()
    }

    /// Total commands dropped by the sender and not yet collected.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
