//! Cross-module scenarios driving the manager through whole ticks
