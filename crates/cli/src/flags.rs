use clap::ValueEnum;
use shadowcaster_indexer::MediaIndexType;

#[derive(Copy, Clone, ValueEnum)]
pub(crate) enum MediaTypeFlag {
    Movie,
    Tv,
    Picture,
    Music,
}

impl MediaTypeFlag {
    pub(crate) const fn as_domain(self) -> MediaIndexType {
        match self {
            MediaTypeFlag::Movie => MediaIndexType::Movie,
            MediaTypeFlag::Tv => MediaIndexType::Tv,
            MediaTypeFlag::Picture => MediaIndexType::Picture,
            MediaTypeFlag::Music => MediaIndexType::Music,
        }
    }
}
