// Surveyed positions for known sellers whose self-reported location is unreliable

use crate::wire::SensorLocation;

/// `(public key hex, surveyed position)` pairs loaded at start-up.
pub const DEFAULT_OVERRIDES: &[(&str, SensorLocation)] = &[
    (
        "027c4a53123b00b54cd004c684a6f93e02fc423d080dc065c2d2efa9b94b660826",
        SensorLocation::new(50.102509, -5.68199, 192.8),
    ),
    (
        "0237ec14e56be526c011c6e6f3c23afead31fceabe2302822985a3c187fc6b72b8",
        SensorLocation::new(49.95967, -6.28422, 67.0),
    ),
    (
        "025d2f109933ce63bb998bc3cf41549e1557fcd1937c5349a9f6f586226ad72fc3",
        SensorLocation::new(49.94661, -6.33147, 52.4),
    ),
    (
        "02e2b54578b8861b5e57aee78bd2452a00d73d30d7706b35856af8b5d56f74d1df",
        SensorLocation::new(49.89252, -6.34473, 74.7),
    ),
    (
        "0359507a76239e5b7db5bd20b900225d72cdc6be4e11599e3e0b97c5c815a75d1a",
        SensorLocation::new(49.91428, -6.29487, 91.4),
    ),
    (
        "02388bdffad38859b6892baaa511a174fcb1dd84f3cb74cc8feb088e004ce5ddf4",
        SensorLocation::new(50.10246, -5.66815, 185.8),
    ),
    (
        "03f34b08f08471eb8049739d2e9c7fa09326e871a648d0b067bc5f517046dd4f15",
        SensorLocation::new(50.15498, -5.65337, 180.8),
    ),
    (
        "021a29e755951b0f0267c0357e8d01489ae41abbe54818e4975b33ca5553b7a902",
        SensorLocation::new(50.09917, -5.55674, 146.4),
    ),
    (
        "022b58a706abfd29d12011f7e08ad037aac80a9c3651ccd5d44679cfb6bfcd409a",
        SensorLocation::new(50.20571, -5.49855, 149.4),
    ),
];
