use super::header::*;
use super::question::*;
use super::resource::*;
use super::*;
use shared::error::*;

// Wire-order message sections, used to keep parsing on track.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Section {
    #[default]
    NotStarted = 0,
    Header = 1,
    Questions = 2,
    Answers = 3,
    Authorities = 4,
    Additionals = 5,
    Done = 6,
}

impl Section {
    fn next(self) -> Section {
        match self {
            Section::NotStarted => Section::Header,
            Section::Header => Section::Questions,
            Section::Questions => Section::Answers,
            Section::Answers => Section::Authorities,
            Section::Authorities => Section::Additionals,
            _ => Section::Done,
        }
    }
}

// A Parser allows incrementally parsing a DNS message.
//
// Each section must be parsed in order: questions, answers, authorities,
// additionals. Reading past the end of a section returns ErrSectionDone and
// advances to the next one.
#[derive(Default)]
pub(crate) struct Parser<'a> {
    msg: &'a [u8],
    header: HeaderInternal,
    section: Section,
    off: usize,
    index: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn start(&mut self, msg: &'a [u8]) -> Result<Header> {
        *self = Parser {
            msg,
            ..Parser::default()
        };
        self.off = self.header.unpack(msg, 0)?;
        self.section = Section::Questions;
        self.index = 0;
        Ok(self.header.header())
    }

    fn section_count(&self, sec: Section) -> usize {
        match sec {
            Section::Questions => self.header.questions as usize,
            Section::Answers => self.header.answers as usize,
            Section::Authorities => self.header.authorities as usize,
            Section::Additionals => self.header.additionals as usize,
            _ => 0,
        }
    }

    fn check_section(&mut self, sec: Section) -> Result<()> {
        if self.section == Section::NotStarted {
            return Err(Error::ErrNotStarted);
        }
        if self.section > sec {
            return Err(Error::ErrSectionDone);
        }
        // Skip whole sections between the current one and the wanted one.
        while self.section < sec {
            while self.index < self.section_count(self.section) {
                self.skip_one()?;
            }
            self.section = self.section.next();
            self.index = 0;
        }
        if self.index == self.section_count(sec) {
            self.section = sec.next();
            self.index = 0;
            return Err(Error::ErrSectionDone);
        }
        Ok(())
    }

    fn skip_one(&mut self) -> Result<()> {
        if self.section == Section::Questions {
            let mut q = Question::default();
            self.off = q.unpack(self.msg, self.off)?;
        } else {
            let mut r = Resource::default();
            self.off = r.unpack(self.msg, self.off)?;
        }
        self.index += 1;
        Ok(())
    }

    // question parses a single Question from the questions section.
    pub(crate) fn question(&mut self) -> Result<Question> {
        self.check_section(Section::Questions)?;
        let mut q = Question::default();
        self.off = q.unpack(self.msg, self.off)?;
        self.index += 1;
        Ok(q)
    }

    // all_questions parses all Questions.
    pub(crate) fn all_questions(&mut self) -> Result<Vec<Question>> {
        let mut questions = Vec::with_capacity(self.header.questions as usize);
        loop {
            match self.question() {
                Ok(q) => questions.push(q),
                Err(Error::ErrSectionDone) => return Ok(questions),
                Err(err) => return Err(err),
            }
        }
    }

    fn resource(&mut self, sec: Section) -> Result<Resource> {
        self.check_section(sec)?;
        let mut r = Resource::default();
        self.off = r.unpack(self.msg, self.off)?;
        self.index += 1;
        Ok(r)
    }

    fn all_resources(&mut self, sec: Section) -> Result<Vec<Resource>> {
        let mut resources = Vec::with_capacity(self.section_count(sec));
        loop {
            match self.resource(sec) {
                Ok(r) => resources.push(r),
                Err(Error::ErrSectionDone) => return Ok(resources),
                Err(err) => return Err(err),
            }
        }
    }

    // all_answers parses all Answer Resources.
    pub(crate) fn all_answers(&mut self) -> Result<Vec<Resource>> {
        self.all_resources(Section::Answers)
    }

    // all_authorities parses all Authority Resources.
    pub(crate) fn all_authorities(&mut self) -> Result<Vec<Resource>> {
        self.all_resources(Section::Authorities)
    }

    // all_additionals parses all Additional Resources.
    pub(crate) fn all_additionals(&mut self) -> Result<Vec<Resource>> {
        self.all_resources(Section::Additionals)
    }
}
