//! Messages from the host loop to the output thread.

#[derive(Debug)]
pub enum AudioCommand {
    /// Append a rendered block of interleaved samples.
    Block(Vec<f32>),

    /// Set output volume (0.0 to 1.0).
    SetVolume(f32),

    /// Drop everything queued but not yet played. Dropped frames still count
    /// as consumed so the audio clock stays aligned with the render head.
    Flush,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringbuf::{
        traits::{Consumer, Producer, Split},
        HeapRb,
    };

    #[test]
    fn commands_keep_their_order() {
        let rb = HeapRb::<AudioCommand>::new(8);
        let (mut prod, mut cons) = rb.split();

        prod.try_push(AudioCommand::SetVolume(0.5)).unwrap();
        prod.try_push(AudioCommand::Block(vec![0.1, -0.1])).unwrap();
        prod.try_push(AudioCommand::Flush).unwrap();

        assert!(matches!(cons.try_pop(), Some(AudioCommand::SetVolume(_))));
        match cons.try_pop() {
            Some(AudioCommand::Block(data)) => assert_eq!(data, vec![0.1, -0.1]),
            other => panic!("expected Block, got {other:?}"),
        }
        assert!(matches!(cons.try_pop(), Some(AudioCommand::Flush)));
        assert!(cons.try_pop().is_none());
    }

    #[test]
    fn full_queue_hands_the_command_back() {
        let rb = HeapRb::<AudioCommand>::new(1);
        let (mut prod, _cons) = rb.split();
        prod.try_push(AudioCommand::Flush).unwrap();
        assert!(matches!(
            prod.try_push(AudioCommand::SetVolume(1.0)),
            Err(AudioCommand::SetVolume(_))
        ));
    }
}
