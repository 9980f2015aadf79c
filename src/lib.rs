// Air Watch - Real-time air quality streaming engine
//
// core   : types, configuration, logging, event log
// layer1 : reading sources
// layer2 : history windows, pipeline and scheduler
// layer3 : transforms, alert state, aggregation, advisory store
// layer4 : broadcast hub, delivery streams, HTTP API

pub mod core;
pub mod layer1;
pub mod layer2;
pub mod layer3;
pub mod layer4;
